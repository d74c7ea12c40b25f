//! Stuck verdicts: what a detector concluded and the evidence behind it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of non-productive condition a detector can report.
///
/// Variant order doubles as the tie-break priority when two detectors
/// fire with near-equal confidence: earlier variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StuckKind {
    /// Position has barely moved over the recent window.
    NoDelta,

    /// The same click keeps landing on the same target with no movement.
    RepeatClick,

    /// The active quest has not advanced within its timeout.
    NoQuestProgress,

    /// The path keeps bouncing between two spots.
    PathOscillation,
}

impl StuckKind {
    /// Tie-break priority. Lower wins when confidences are within epsilon.
    pub(crate) fn priority(self) -> u8 {
        match self {
            StuckKind::NoDelta => 0,
            StuckKind::RepeatClick => 1,
            StuckKind::NoQuestProgress => 2,
            StuckKind::PathOscillation => 3,
        }
    }
}

impl fmt::Display for StuckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StuckKind::NoDelta => "no_delta",
            StuckKind::RepeatClick => "repeat_click",
            StuckKind::NoQuestProgress => "no_quest_progress",
            StuckKind::PathOscillation => "path_oscillation",
        };
        f.write_str(name)
    }
}

/// The measurements that produced a verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Evidence {
    /// Position spread over the recent window was under the threshold.
    Spread {
        spread: f64,
        threshold: f64,
        samples: usize,
    },

    /// A run of identical clicks with no intervening movement.
    ClickRun {
        action: String,
        target: String,
        count: u32,
    },

    /// Time since the active quest last advanced.
    QuestStalled {
        quest: String,
        stalled_secs: i64,
        timeout_secs: i64,
    },

    /// Back-and-forth movement between two clusters.
    Oscillation { alternations: u32, window: usize },
}

/// A detector's conclusion: the agent is non-productive in some way.
///
/// Transient — produced on an evaluation tick, consumed by the executor,
/// and persisted only as part of a timeline event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub kind: StuckKind,

    /// How certain the detector is, in `[0, 1]`.
    pub confidence: f64,

    pub evidence: Evidence,
}
