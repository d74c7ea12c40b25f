//! Coarse-lock wrapper for multi-threaded hosts.
//!
//! The engine itself is single-threaded. When a background poller feeds
//! signals while a UI thread reads snapshots, wrap the engine here: one
//! mutex guards all mutation, and the tick releases it across the
//! external driver call so a slow recovery action never blocks a
//! concurrent status read.

use std::sync::{Arc, Mutex, MutexGuard};

use jiff::Timestamp;

use crate::drive::{InputDriver, Notifier, PositionSource};
use crate::engine::{Plan, RecoveryEngine, TickResult};
use crate::model::Point;
use crate::signals::InvalidSignalError;
use crate::status::StatusSnapshot;

/// A cloneable handle to an engine behind a single coarse lock.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<RecoveryEngine>>,
}

impl SharedEngine {
    #[must_use]
    pub fn new(engine: RecoveryEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    // ── Signals ──

    pub fn record_position(&self, x: f64, y: f64, at: Timestamp) -> Result<(), InvalidSignalError> {
        self.lock().record_position(x, y, at)
    }

    pub fn record_click(
        &self,
        action: &str,
        target: &str,
        at: Timestamp,
    ) -> Result<(), InvalidSignalError> {
        self.lock().record_click(action, target, at)
    }

    pub fn record_quest_progress(
        &self,
        quest: &str,
        value: i64,
        at: Timestamp,
    ) -> Result<(), InvalidSignalError> {
        self.lock().record_quest_progress(quest, value, at)
    }

    // ── The tick ──

    /// Runs one evaluation-and-recovery pass.
    ///
    /// The lock is held for planning and bookkeeping only — position
    /// polls, the driver call, and notifications all run unlocked, so
    /// status reads stay responsive during a slow recovery action and an
    /// abort request can land mid-dispatch.
    pub fn tick(
        &self,
        now: Timestamp,
        active_quest: Option<&str>,
        driver: &mut dyn InputDriver,
        positions: &mut dyn PositionSource,
        mut notifier: Option<&mut dyn Notifier>,
    ) -> TickResult {
        let plan = self.lock().plan(now, active_quest);

        match plan {
            Plan::Idle => TickResult::NoAction,
            Plan::SafeExited => TickResult::SafeExit,
            Plan::Execute(pending) => {
                let before = positions.sample().map(|(x, y)| Point { x, y });
                let result = driver.execute(pending.action, pending.timeout);
                let after = positions.sample().map(|(x, y)| Point { x, y });

                let (tick_result, events) = {
                    let mut engine = self.lock();
                    let tick_result = engine.complete(pending, before, result, after, now);
                    (tick_result, engine.drain_notifications())
                };

                if let Some(notifier) = notifier.as_mut() {
                    for event in &events {
                        notifier.notify(event);
                    }
                }
                tick_result
            }
        }
    }

    /// Marks the in-flight dispatch as aborted; see
    /// [`RecoveryEngine::request_abort`].
    pub fn abort_current_recovery(&self) {
        self.lock().request_abort();
    }

    /// An owned point-in-time view; never blocks on an in-flight action.
    #[must_use]
    pub fn snapshot(&self, now: Timestamp) -> StatusSnapshot {
        self.lock().snapshot(now)
    }

    fn lock(&self) -> MutexGuard<'_, RecoveryEngine> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
