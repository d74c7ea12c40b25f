//! The in-memory timeline: an append-only record of detection and
//! recovery activity.
//!
//! Entries are never mutated or deleted here; retention belongs to the
//! caller. Durable persistence lives in [`crate::storage`].

use std::collections::HashMap;
use std::io::Write;

use serde::Serialize;

use crate::model::{Outcome, StuckKind, TimelineEvent};
use crate::storage::StorageError;

/// Counts of timeline activity, for dashboards and health checks.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSummary {
    pub total: usize,
    pub by_outcome: HashMap<Outcome, usize>,
    pub by_kind: HashMap<StuckKind, usize>,
}

/// The session's append-only event record.
#[derive(Debug, Default)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
}

impl Timeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event. Events are immutable once recorded.
    pub fn append(&mut self, event: TimelineEvent) {
        self.events.push(event);
    }

    /// All events, oldest first.
    #[must_use]
    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// The last `n` events, oldest first. Returns copies.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<TimelineEvent> {
        let start = self.events.len().saturating_sub(n);
        self.events[start..].to_vec()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Counts by outcome and by stuck kind.
    #[must_use]
    pub fn summary(&self) -> TimelineSummary {
        let mut summary = TimelineSummary {
            total: self.events.len(),
            ..TimelineSummary::default()
        };
        for event in &self.events {
            if let Some(outcome) = event.outcome {
                *summary.by_outcome.entry(outcome).or_default() += 1;
            }
            if let Some(kind) = event.kind {
                *summary.by_kind.entry(kind).or_default() += 1;
            }
        }
        summary
    }

    /// Writes every event as one JSON object per line.
    pub fn export<W: Write>(&self, mut writer: W) -> Result<(), StorageError> {
        for event in &self.events {
            let mut line = serde_json::to_string(event)?;
            line.push('\n');
            writer.write_all(line.as_bytes())?;
        }
        Ok(())
    }
}
