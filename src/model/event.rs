//! Timeline events: immutable records of detection and recovery activity.
//!
//! One event = one line of JSONL when exported. Events are never mutated
//! after creation; retention and rotation belong to the caller.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActionId, Point, StuckKind};

/// How a recovery attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// The triggering condition demonstrably cleared.
    Success,

    /// The action ran but the condition did not clear.
    /// Also used when verification was ambiguous — ambiguity escalates.
    Failure,

    /// Every applicable rung was still cooling down; nothing was tried.
    SkippedCooldown,

    /// The caller aborted mid-dispatch. Still counts for backoff.
    Skipped,

    /// The input driver failed or timed out.
    Error,
}

/// A single entry in the timeline.
///
/// `kind` and `confidence` describe the verdict that triggered the entry.
/// `outcome` is `None` for audit entries recorded on idle evaluations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: Uuid,

    /// When the entry was recorded.
    pub at: Timestamp,

    /// The stuck condition this entry responds to, if any.
    pub kind: Option<StuckKind>,

    /// Confidence of the triggering verdict; 0 when there was none.
    pub confidence: f64,

    /// The rung that was dispatched, if one was.
    pub action: Option<ActionId>,

    pub outcome: Option<Outcome>,

    /// Position sampled just before the action was dispatched.
    pub before: Option<Point>,

    /// Position sampled after the action completed.
    pub after: Option<Point>,
}
