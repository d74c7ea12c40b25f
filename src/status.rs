//! Read-only status snapshots for dashboards and the owning agent loop.
//!
//! Snapshots are owned copies — handing one out can never expose the
//! engine's internal buffers. The `seq` number increases with every
//! engine mutation, so a consumer holding two snapshots can tell which
//! is stale.

use jiff::Timestamp;
use serde::Serialize;

use crate::engine::Phase;
use crate::model::{ActionId, TimelineEvent, Verdict};

/// One cooling-down action and how long until it is available again.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownStatus {
    pub action: ActionId,
    pub remaining_secs: i64,
}

/// A point-in-time view of the recovery engine.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Monotonic version: bumped on every engine mutation.
    pub seq: u64,

    /// When the snapshot was taken.
    pub taken_at: Timestamp,

    pub phase: Phase,

    /// Verdicts from the most recent evaluation tick.
    pub verdicts: Vec<Verdict>,

    /// Actions currently on cooldown, soonest available first.
    pub cooldowns: Vec<CooldownStatus>,

    /// The most recent timeline events, oldest first.
    pub recent: Vec<TimelineEvent>,

    /// Recovery attempts since the last success, consecutively.
    pub failure_streak: u32,

    /// Attempts inside the safety ceiling's rolling window.
    pub attempts_in_window: usize,
}
