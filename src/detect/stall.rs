//! Coordinate-stall detection: the agent is standing still.

use crate::model::{Evidence, StuckKind, Verdict};
use crate::signals::SignalBuffer;

use super::Thresholds;

/// Reports `NoDelta` when the recent position window barely moves.
///
/// Spread is the maximum pairwise Euclidean distance across the window.
/// Confidence scales with how far under the threshold the spread is:
/// a dead stop reads 1.0, spread just under the threshold reads near 0.
#[must_use]
pub fn detect_coordinate_stall(buffer: &SignalBuffer, thresholds: &Thresholds) -> Option<Verdict> {
    let samples = buffer.positions();
    if samples.len() < thresholds.position_window {
        return None;
    }

    let mut spread = 0.0f64;
    for (i, a) in samples.iter().enumerate() {
        for b in samples.iter().skip(i + 1) {
            spread = spread.max(a.point.distance(b.point));
        }
    }

    if spread >= thresholds.coordinate_delta {
        return None;
    }

    let confidence = (1.0 - spread / thresholds.coordinate_delta).clamp(0.0, 1.0);
    Some(Verdict {
        kind: StuckKind::NoDelta,
        confidence,
        evidence: Evidence::Spread {
            spread,
            threshold: thresholds.coordinate_delta,
            samples: samples.len(),
        },
    })
}
