//! Signal types: raw observations fed into the rolling windows.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A position in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A single position reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    pub point: Point,

    /// When the position was read.
    pub at: Timestamp,
}

/// A UI action attempted against a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    /// What was attempted (e.g. "npc_interact").
    pub action: String,

    /// What it was aimed at (e.g. "quest_giver").
    pub target: String,

    /// When the click was issued.
    pub at: Timestamp,
}

/// The last known progress for a quest.
///
/// Updated only when the value actually changes, so `at` measures time
/// since real progress rather than time since the last poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestProgress {
    pub quest: String,
    pub value: i64,
    pub at: Timestamp,
}
