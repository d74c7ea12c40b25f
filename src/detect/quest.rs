//! Quest-stall detection: the active quest has stopped advancing.

use jiff::Timestamp;

use crate::model::{Evidence, StuckKind, Verdict};
use crate::signals::SignalBuffer;

use super::Thresholds;

/// Reports `NoQuestProgress` when the caller-supplied active quest has
/// gone longer than the timeout without a real progress change.
///
/// Confidence scales linearly from 0 at the timeout boundary to 1 at
/// twice the timeout.
#[must_use]
pub fn detect_quest_stall(
    buffer: &SignalBuffer,
    active_quest: Option<&str>,
    now: Timestamp,
    thresholds: &Thresholds,
) -> Option<Verdict> {
    let quest = active_quest?;
    let progress = buffer.quest(quest)?;

    let stalled_secs = now.duration_since(progress.at).as_secs();
    let timeout_secs = thresholds.quest_timeout_secs;
    if stalled_secs <= timeout_secs {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let confidence =
        ((stalled_secs - timeout_secs) as f64 / timeout_secs as f64).clamp(0.0, 1.0);
    Some(Verdict {
        kind: StuckKind::NoQuestProgress,
        confidence,
        evidence: Evidence::QuestStalled {
            quest: quest.to_string(),
            stalled_secs,
            timeout_secs,
        },
    })
}
