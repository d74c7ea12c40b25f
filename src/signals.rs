//! Rolling signal windows: recent positions, clicks, and quest progress.
//!
//! Pure data structure — no detection logic. Appends and evictions are
//! O(1) amortized. Malformed input is rejected at this boundary with
//! [`InvalidSignalError`]; the calling tick skips the sample and continues.

use std::collections::{HashMap, VecDeque};

use jiff::Timestamp;

use crate::model::{ClickEvent, Point, PositionSample, QuestProgress};

/// A rejected signal. Never fatal — the caller drops the sample.
#[derive(Debug, thiserror::Error)]
pub enum InvalidSignalError {
    #[error("non-finite coordinates ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },

    #[error("{stream} timestamp {at} precedes the latest sample at {latest}")]
    TimestampRegression {
        stream: &'static str,
        at: Timestamp,
        latest: Timestamp,
    },
}

pub type Result<T> = core::result::Result<T, InvalidSignalError>;

/// A run of identical clicks, tracked separately from the raw window so
/// "N consecutive same click" stays answerable after eviction.
#[derive(Debug, Clone)]
struct ClickRun {
    action: String,
    target: String,
    count: u32,

    /// Position when the run started. Movement beyond the jitter
    /// tolerance from here breaks the run.
    anchor: Option<Point>,
}

/// Fixed-size rolling windows of recent signals.
#[derive(Debug)]
pub struct SignalBuffer {
    positions: VecDeque<PositionSample>,
    position_capacity: usize,
    clicks: VecDeque<ClickEvent>,
    click_capacity: usize,
    quests: HashMap<String, QuestProgress>,
    jitter_tolerance: f64,
    run: Option<ClickRun>,
}

impl SignalBuffer {
    /// Creates empty windows with the given capacities.
    ///
    /// `jitter_tolerance` is the movement (in world units) that breaks a
    /// consecutive-click run.
    #[must_use]
    pub fn new(position_capacity: usize, click_capacity: usize, jitter_tolerance: f64) -> Self {
        Self {
            positions: VecDeque::with_capacity(position_capacity),
            position_capacity,
            clicks: VecDeque::with_capacity(click_capacity),
            click_capacity,
            quests: HashMap::new(),
            jitter_tolerance,
            run: None,
        }
    }

    // ── Recording ──

    /// Appends a position sample, evicting the oldest at capacity.
    pub fn record_position(&mut self, x: f64, y: f64, at: Timestamp) -> Result<()> {
        if !x.is_finite() || !y.is_finite() {
            return Err(InvalidSignalError::NonFiniteCoordinate { x, y });
        }
        if let Some(latest) = self.positions.back()
            && at < latest.at
        {
            return Err(InvalidSignalError::TimestampRegression {
                stream: "position",
                at,
                latest: latest.at,
            });
        }

        let point = Point { x, y };
        self.positions.push_back(PositionSample { point, at });
        if self.positions.len() > self.position_capacity {
            self.positions.pop_front();
        }

        // A click run survives small jitter but not real movement.
        if let Some(mut run) = self.run.take() {
            let broken = run
                .anchor
                .is_some_and(|anchor| anchor.distance(point) > self.jitter_tolerance);
            if !broken {
                if run.anchor.is_none() {
                    run.anchor = Some(point);
                }
                self.run = Some(run);
            }
        }

        Ok(())
    }

    /// Appends a click event, evicting the oldest at capacity.
    pub fn record_click(&mut self, action: &str, target: &str, at: Timestamp) -> Result<()> {
        if let Some(latest) = self.clicks.back()
            && at < latest.at
        {
            return Err(InvalidSignalError::TimestampRegression {
                stream: "click",
                at,
                latest: latest.at,
            });
        }

        self.clicks.push_back(ClickEvent {
            action: action.to_string(),
            target: target.to_string(),
            at,
        });
        if self.clicks.len() > self.click_capacity {
            self.clicks.pop_front();
        }

        match &mut self.run {
            Some(run) if run.action == action && run.target == target => run.count += 1,
            _ => {
                self.run = Some(ClickRun {
                    action: action.to_string(),
                    target: target.to_string(),
                    count: 1,
                    anchor: self.positions.back().map(|s| s.point),
                });
            }
        }

        Ok(())
    }

    /// Records quest progress, but only when the value actually changed.
    ///
    /// This is what lets the quest-stall detector measure time since real
    /// progress rather than time since the last poll.
    pub fn record_quest_progress(&mut self, quest: &str, value: i64, at: Timestamp) -> Result<()> {
        if let Some(known) = self.quests.get(quest) {
            if at < known.at {
                return Err(InvalidSignalError::TimestampRegression {
                    stream: "quest",
                    at,
                    latest: known.at,
                });
            }
            if known.value == value {
                return Ok(());
            }
        }

        self.quests.insert(
            quest.to_string(),
            QuestProgress {
                quest: quest.to_string(),
                value,
                at,
            },
        );
        Ok(())
    }

    // ── Reading ──

    /// Recent position samples, oldest first.
    #[must_use]
    pub fn positions(&self) -> &VecDeque<PositionSample> {
        &self.positions
    }

    /// The most recent position, if any.
    #[must_use]
    pub fn latest_position(&self) -> Option<PositionSample> {
        self.positions.back().copied()
    }

    /// Recent click events, oldest first.
    #[must_use]
    pub fn clicks(&self) -> &VecDeque<ClickEvent> {
        &self.clicks
    }

    /// The current consecutive-click run as `(action, target, count)`.
    #[must_use]
    pub fn click_run(&self) -> Option<(&str, &str, u32)> {
        self.run
            .as_ref()
            .map(|r| (r.action.as_str(), r.target.as_str(), r.count))
    }

    /// Last known progress for a quest.
    #[must_use]
    pub fn quest(&self, quest: &str) -> Option<&QuestProgress> {
        self.quests.get(quest)
    }

    /// Breaks the current consecutive-click run.
    ///
    /// Called after a recovery action executes: whatever the agent does
    /// next is no longer the same uninterrupted spam.
    pub(crate) fn clear_click_run(&mut self) {
        self.run = None;
    }
}
