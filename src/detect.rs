//! Detection logic: read the signal windows, produce stuck verdicts.
//!
//! Each detector has its own submodule that knows how to judge one kind
//! of non-productive condition. Detectors are pure functions over the
//! buffer plus thresholds — no shared mutable state between them.

mod clicks;
mod oscillation;
mod quest;
mod stall;

pub use clicks::detect_repeat_click;
pub use oscillation::detect_oscillation;
pub use quest::detect_quest_stall;
pub use stall::detect_coordinate_stall;

use jiff::Timestamp;

use crate::model::Verdict;
use crate::signals::SignalBuffer;

/// Detector thresholds. Defaults match the tuning the engine ships with.
#[derive(Debug, Clone)]
pub struct Thresholds {
    /// Samples required (and considered) by the coordinate-stall detector.
    pub position_window: usize,

    /// Spread (world units) under which the agent counts as not moving.
    pub coordinate_delta: f64,

    /// Consecutive identical clicks before the repeat-click detector fires.
    pub repeat_click: u32,

    /// Seconds without quest progress before the quest-stall detector fires.
    pub quest_timeout_secs: i64,

    /// Samples inspected by the oscillation detector.
    pub oscillation_window: usize,

    /// Radius (world units) within which samples share a cluster.
    pub cluster_radius: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            position_window: 10,
            coordinate_delta: 5.0,
            repeat_click: 5,
            quest_timeout_secs: 300,
            oscillation_window: 6,
            cluster_radius: 3.0,
        }
    }
}

/// Runs all four detectors and collects whatever fired.
///
/// `active_quest` is supplied by the caller, never inferred — the quest
/// detector stays silent without it.
#[must_use]
pub fn evaluate(
    buffer: &SignalBuffer,
    active_quest: Option<&str>,
    now: Timestamp,
    thresholds: &Thresholds,
) -> Vec<Verdict> {
    [
        detect_coordinate_stall(buffer, thresholds),
        detect_repeat_click(buffer, thresholds),
        detect_quest_stall(buffer, active_quest, now, thresholds),
        detect_oscillation(buffer, thresholds),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Picks the single verdict to act on.
///
/// Highest confidence wins; when two verdicts land within `epsilon` of
/// each other, the fixed [`crate::model::StuckKind`] priority order breaks
/// the tie.
#[must_use]
pub fn select(verdicts: &[Verdict], epsilon: f64) -> Option<&Verdict> {
    let mut best: Option<&Verdict> = None;
    for verdict in verdicts {
        let Some(current) = best else {
            best = Some(verdict);
            continue;
        };
        if verdict.confidence > current.confidence + epsilon {
            best = Some(verdict);
        } else if (verdict.confidence - current.confidence).abs() <= epsilon
            && verdict.kind.priority() < current.kind.priority()
        {
            best = Some(verdict);
        }
    }
    best
}
