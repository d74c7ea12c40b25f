//! Core data model for the recovery engine.
//!
//! These types represent the conceptual architecture:
//! signals, stuck verdicts, recovery actions, and timeline events.

mod action;
mod event;
mod signal;
mod verdict;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use action::{ActionId, ActionSpec, Playbook, PlaybookError};
pub use event::{Outcome, TimelineEvent};
pub use signal::{ClickEvent, Point, PositionSample, QuestProgress};
pub use verdict::{Evidence, StuckKind, Verdict};

/// Metadata for one agent session.
///
/// One recovery engine is instantiated per session; the durable timeline
/// for the session lives in its own directory keyed by `id`.
/// Identity is recorded so multiple agents can share a storage root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,

    /// Which agent this session belongs to (e.g. "miner-03").
    pub agent: String,

    /// When the session began.
    pub started_at: Timestamp,
}
