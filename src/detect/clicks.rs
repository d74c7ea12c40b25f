//! Repeated-click detection: hammering the same target gets nowhere.

use crate::model::{Evidence, StuckKind, Verdict};
use crate::signals::SignalBuffer;

use super::Thresholds;

/// Reports `RepeatClick` when the same `(action, target)` pair has been
/// clicked consecutively at least the threshold number of times.
///
/// The buffer already breaks the run on real movement, so a surviving run
/// means the clicks achieved nothing. Confidence is `count / threshold`,
/// capped at 1.
#[must_use]
pub fn detect_repeat_click(buffer: &SignalBuffer, thresholds: &Thresholds) -> Option<Verdict> {
    let (action, target, count) = buffer.click_run()?;
    if count < thresholds.repeat_click {
        return None;
    }

    let confidence = (f64::from(count) / f64::from(thresholds.repeat_click)).min(1.0);
    Some(Verdict {
        kind: StuckKind::RepeatClick,
        confidence,
        evidence: Evidence::ClickRun {
            action: action.to_string(),
            target: target.to_string(),
            count,
        },
    })
}
