//! The recovery playbook executor: evaluate, select, execute, verify.
//!
//! The engine is driven by an explicit `tick(now, ...)` from the owning
//! agent loop. One tick walks the machine from evaluation through
//! verification: run the detectors, pick the winning verdict, pick the
//! lowest applicable rung that is off cooldown, dispatch it through the
//! input driver, then verify by comparing position before and after.
//!
//! Escalation is emergent rather than tracked: a failed rung sits on an
//! extended cooldown, so the next tick's selection naturally lands on the
//! next rung up. The safety ceiling bounds the whole process — too many
//! attempts without a success inside the rolling window forces a safe
//! logout, and from then on the engine is terminal.
//!
//! The tick is split into `plan` and `complete` so a host holding a lock
//! around the engine can release it across the external driver call.

use std::collections::VecDeque;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ConfigError, EngineConfig};
use crate::cooldown::CooldownManager;
use crate::detect::{self, Thresholds};
use crate::drive::{DriveResult, InputDriver, Notifier, PositionSource};
use crate::model::{ActionId, Outcome, Playbook, Point, StuckKind, TimelineEvent, Verdict};
use crate::signals::{InvalidSignalError, SignalBuffer};
use crate::status::{CooldownStatus, StatusSnapshot};
use crate::storage::EventLog;
use crate::timeline::Timeline;

/// Fallback dispatch timeout for a forced logout when the playbook
/// carries no explicit safe-logout rung.
const FORCED_EXIT_TIMEOUT_SECS: i64 = 30;

/// The externally visible phase of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum Phase {
    /// Nothing wrong, or recovery stood down.
    Idle,

    /// A stuck condition is active and being worked through the ladder.
    Recovering { kind: StuckKind },

    /// Terminal. The safety ceiling fired or the ladder was exhausted.
    SafeExit,
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickResult {
    /// No stuck condition above the confidence threshold, or every
    /// applicable rung was cooling down.
    NoAction,

    /// A rung was dispatched; its outcome is already recorded.
    ActionTaken { action: ActionId, outcome: Outcome },

    /// The engine is terminal. The owning loop should stop the agent.
    SafeExit,
}

/// A planned dispatch, produced by [`RecoveryEngine::plan`] and consumed
/// by [`RecoveryEngine::complete`] after the driver call.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub action: ActionId,
    pub timeout: SignedDuration,
    pub(crate) verdict: Verdict,
    pub(crate) forced_exit: bool,
}

/// What [`RecoveryEngine::plan`] decided for this tick.
#[derive(Debug, Clone)]
pub enum Plan {
    /// Nothing to dispatch.
    Idle,

    /// The engine already reached safe exit.
    SafeExited,

    /// Dispatch this action, then call `complete`.
    Execute(PendingAction),
}

/// The external collaborators one tick needs.
pub struct Harness<'a> {
    pub driver: &'a mut dyn InputDriver,
    pub positions: &'a mut dyn PositionSource,
    pub notifier: Option<&'a mut dyn Notifier>,
}

/// The stuck-detection-and-recovery state machine for one agent session.
pub struct RecoveryEngine {
    config: EngineConfig,
    thresholds: Thresholds,
    playbook: Playbook,
    signals: SignalBuffer,
    cooldowns: CooldownManager,
    timeline: Timeline,
    event_log: Option<EventLog>,
    phase: Phase,

    /// Bumped on every mutation; versions status snapshots.
    seq: u64,

    last_verdicts: Vec<Verdict>,

    /// Dispatch timestamps without an intervening success, oldest first.
    attempts: VecDeque<Timestamp>,

    failure_streak: u32,
    abort_requested: bool,
    safe_exit_notified: bool,
    pending_notifications: Vec<TimelineEvent>,
}

impl RecoveryEngine {
    /// Creates an engine with the standard six-rung ladder.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_playbook(config, Playbook::standard())
    }

    /// Creates an engine with a custom ladder.
    pub fn with_playbook(config: EngineConfig, playbook: Playbook) -> Result<Self, ConfigError> {
        config.validate()?;
        let thresholds = config.thresholds();
        let signals = SignalBuffer::new(
            config.position_window,
            config.click_capacity,
            config.jitter_tolerance,
        );
        let cooldowns = CooldownManager::new(config.backoff_factor, config.cooldown_ceiling_secs);

        Ok(Self {
            config,
            thresholds,
            playbook,
            signals,
            cooldowns,
            timeline: Timeline::new(),
            event_log: None,
            phase: Phase::Idle,
            seq: 0,
            last_verdicts: Vec::new(),
            attempts: VecDeque::new(),
            failure_streak: 0,
            abort_requested: false,
            safe_exit_notified: false,
            pending_notifications: Vec::new(),
        })
    }

    /// Also append every timeline event to a durable session log.
    #[must_use]
    pub fn with_event_log(mut self, log: EventLog) -> Self {
        self.event_log = Some(log);
        self
    }

    // ── Signals ──

    /// Feeds a position sample into the rolling window.
    pub fn record_position(
        &mut self,
        x: f64,
        y: f64,
        at: Timestamp,
    ) -> Result<(), InvalidSignalError> {
        self.seq += 1;
        self.signals
            .record_position(x, y, at)
            .inspect_err(|error| warn!(%error, "rejected position sample"))
    }

    /// Feeds a click event into the rolling window.
    pub fn record_click(
        &mut self,
        action: &str,
        target: &str,
        at: Timestamp,
    ) -> Result<(), InvalidSignalError> {
        self.seq += 1;
        self.signals
            .record_click(action, target, at)
            .inspect_err(|error| warn!(%error, "rejected click event"))
    }

    /// Feeds a quest progress reading; only real changes are stored.
    pub fn record_quest_progress(
        &mut self,
        quest: &str,
        value: i64,
        at: Timestamp,
    ) -> Result<(), InvalidSignalError> {
        self.seq += 1;
        self.signals
            .record_quest_progress(quest, value, at)
            .inspect_err(|error| warn!(%error, "rejected quest progress"))
    }

    // ── The tick ──

    /// Runs one full evaluation-and-recovery pass.
    ///
    /// Convenience for single-threaded hosts; multi-threaded hosts use
    /// [`plan`](Self::plan) and [`complete`](Self::complete) directly so
    /// no lock is held across the driver call (see [`crate::shared`]).
    pub fn tick(
        &mut self,
        now: Timestamp,
        active_quest: Option<&str>,
        harness: &mut Harness<'_>,
    ) -> TickResult {
        match self.plan(now, active_quest) {
            Plan::Idle => TickResult::NoAction,
            Plan::SafeExited => TickResult::SafeExit,
            Plan::Execute(pending) => {
                let before = harness.positions.sample().map(|(x, y)| Point { x, y });
                let result = harness.driver.execute(pending.action, pending.timeout);
                let after = harness.positions.sample().map(|(x, y)| Point { x, y });

                let tick_result = self.complete(pending, before, result, after, now);

                let events = self.drain_notifications();
                if let Some(notifier) = harness.notifier.as_mut() {
                    for event in &events {
                        notifier.notify(event);
                    }
                }
                tick_result
            }
        }
    }

    /// EVALUATING and SELECTING_ACTION: decide what, if anything, to run.
    pub fn plan(&mut self, now: Timestamp, active_quest: Option<&str>) -> Plan {
        if self.phase == Phase::SafeExit {
            return Plan::SafeExited;
        }
        self.seq += 1;
        self.prune_attempts(now);

        let verdicts = detect::evaluate(&self.signals, active_quest, now, &self.thresholds);
        self.last_verdicts.clone_from(&verdicts);

        let winner = detect::select(&verdicts, self.config.confidence_epsilon)
            .filter(|v| v.confidence >= self.config.min_confidence)
            .cloned();

        let Some(winner) = winner else {
            if self.config.log_evaluations {
                let best = detect::select(&verdicts, self.config.confidence_epsilon);
                self.append_event(TimelineEvent {
                    id: Uuid::new_v4(),
                    at: now,
                    kind: best.map(|v| v.kind),
                    confidence: best.map_or(0.0, |v| v.confidence),
                    action: None,
                    outcome: None,
                    before: None,
                    after: None,
                });
            }
            self.phase = Phase::Idle;
            return Plan::Idle;
        };

        debug!(kind = %winner.kind, confidence = winner.confidence, "stuck verdict selected");
        self.phase = Phase::Recovering { kind: winner.kind };

        if self.attempts.len() >= self.config.max_recovery_attempts as usize {
            warn!(
                attempts = self.attempts.len(),
                "safety ceiling breached, forcing safe exit"
            );
            let timeout = self.playbook.get(ActionId::SafeLogout).map_or(
                SignedDuration::from_secs(FORCED_EXIT_TIMEOUT_SECS),
                |spec| SignedDuration::from_secs(spec.timeout_secs),
            );
            return Plan::Execute(PendingAction {
                action: ActionId::SafeLogout,
                timeout,
                verdict: winner,
                forced_exit: true,
            });
        }

        let pick = self
            .playbook
            .candidates(winner.kind)
            .find(|spec| self.cooldowns.is_available(spec.id, now))
            .map(|spec| (spec.id, spec.timeout_secs));

        match pick {
            Some((action, timeout_secs)) => {
                info!(action = %action, kind = %winner.kind, "dispatching recovery action");
                Plan::Execute(PendingAction {
                    action,
                    timeout: SignedDuration::from_secs(timeout_secs),
                    verdict: winner,
                    forced_exit: false,
                })
            }
            None => {
                debug!(kind = %winner.kind, "every applicable rung is cooling down");
                self.append_event(TimelineEvent {
                    id: Uuid::new_v4(),
                    at: now,
                    kind: Some(winner.kind),
                    confidence: winner.confidence,
                    action: None,
                    outcome: Some(Outcome::SkippedCooldown),
                    before: None,
                    after: None,
                });
                Plan::Idle
            }
        }
    }

    /// VERIFYING and bookkeeping, after the driver call finished.
    pub fn complete(
        &mut self,
        pending: PendingAction,
        before: Option<Point>,
        result: DriveResult,
        after: Option<Point>,
        now: Timestamp,
    ) -> TickResult {
        self.seq += 1;
        let aborted = std::mem::take(&mut self.abort_requested);
        // The final rung is the safe exit whether it was reached by
        // climbing the ladder or forced by the ceiling.
        let terminal = pending.forced_exit || pending.action == ActionId::SafeLogout;

        let outcome = if aborted {
            debug!(action = %pending.action, "recovery aborted by caller");
            Outcome::Skipped
        } else {
            match &result {
                DriveResult::Completed if terminal => Outcome::Success,
                DriveResult::Completed => self.verify(before, after),
                DriveResult::Failed(reason) => {
                    warn!(action = %pending.action, reason = %reason, "input driver failed");
                    Outcome::Error
                }
                DriveResult::TimedOut => {
                    warn!(action = %pending.action, "input driver timed out");
                    Outcome::Error
                }
            }
        };

        if let Some(point) = after {
            // A fresh reading is a real sample; keep the windows current.
            let _ = self.signals.record_position(point.x, point.y, now);
        }

        // Every dispatched attempt starts its cooldown, aborted ones
        // included — the action did go out.
        if let Some(spec) = self.playbook.get(pending.action) {
            self.cooldowns.record_execution(spec, now);
        }

        match outcome {
            Outcome::Success => {
                self.cooldowns.record_success(pending.action);
                self.attempts.clear();
                self.failure_streak = 0;
                self.signals.clear_click_run();
                if !terminal {
                    self.phase = Phase::Idle;
                }
            }
            Outcome::Failure | Outcome::Error => {
                self.attempts.push_back(now);
                self.failure_streak = self.failure_streak.saturating_add(1);
            }
            Outcome::Skipped => {
                // Attempted, so it counts toward the ceiling, but it is
                // not a failure of the remedy itself.
                self.attempts.push_back(now);
            }
            Outcome::SkippedCooldown => {}
        }

        let event = TimelineEvent {
            id: Uuid::new_v4(),
            at: now,
            kind: Some(pending.verdict.kind),
            confidence: pending.verdict.confidence,
            action: Some(pending.action),
            outcome: Some(outcome),
            before,
            after,
        };

        if terminal {
            info!(outcome = ?outcome, "safe exit reached, engine is terminal");
            self.phase = Phase::SafeExit;
            if !self.safe_exit_notified {
                self.safe_exit_notified = true;
                self.pending_notifications.push(event.clone());
            }
        } else if outcome == Outcome::Error {
            self.pending_notifications.push(event.clone());
        }

        self.append_event(event);

        if terminal {
            TickResult::SafeExit
        } else {
            TickResult::ActionTaken {
                action: pending.action,
                outcome,
            }
        }
    }

    /// Marks the in-flight dispatch as aborted.
    ///
    /// Its outcome is recorded as `Skipped`, but it still counts as
    /// attempted for cooldown and backoff purposes — it was dispatched.
    pub fn request_abort(&mut self) {
        self.abort_requested = true;
    }

    /// Notifications queued since the last drain, oldest first.
    ///
    /// The single-threaded [`tick`](Self::tick) drains these into the
    /// harness notifier itself; split-phase hosts drain after unlocking.
    pub fn drain_notifications(&mut self) -> Vec<TimelineEvent> {
        std::mem::take(&mut self.pending_notifications)
    }

    // ── Read side ──

    /// An owned point-in-time view for dashboards and the owning loop.
    #[must_use]
    pub fn snapshot(&self, now: Timestamp) -> StatusSnapshot {
        let window = SignedDuration::from_secs(self.config.attempt_window_secs);
        let attempts_in_window = self
            .attempts
            .iter()
            .filter(|t| now.duration_since(**t) <= window)
            .count();

        StatusSnapshot {
            seq: self.seq,
            taken_at: now,
            phase: self.phase,
            verdicts: self.last_verdicts.clone(),
            cooldowns: self
                .cooldowns
                .active(now)
                .into_iter()
                .map(|(action, remaining)| CooldownStatus {
                    action,
                    remaining_secs: remaining.as_secs(),
                })
                .collect(),
            recent: self.timeline.recent(self.config.status_recent_events),
            failure_streak: self.failure_streak,
            attempts_in_window,
        }
    }

    /// The session's in-memory timeline.
    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// The ladder this engine escalates through.
    #[must_use]
    pub fn playbook(&self) -> &Playbook {
        &self.playbook
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    // ── Internals ──

    fn verify(&self, before: Option<Point>, after: Option<Point>) -> Outcome {
        match (before, after) {
            (Some(b), Some(a)) if b.distance(a) > self.config.coordinate_delta_threshold => {
                Outcome::Success
            }
            // Unmoved, or the position source is unavailable: treat as
            // failure so escalation continues rather than standing down
            // on false confidence.
            _ => Outcome::Failure,
        }
    }

    fn prune_attempts(&mut self, now: Timestamp) {
        let window = SignedDuration::from_secs(self.config.attempt_window_secs);
        while let Some(oldest) = self.attempts.front() {
            if now.duration_since(*oldest) > window {
                self.attempts.pop_front();
            } else {
                break;
            }
        }
    }

    fn append_event(&mut self, event: TimelineEvent) {
        if let Some(log) = &mut self.event_log
            && let Err(error) = log.append(&event)
        {
            // Durable logging is best-effort; the in-memory record stands.
            warn!(%error, "failed to persist timeline event");
        }
        self.timeline.append(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::model::{ActionSpec, Session};
    use crate::storage::Storage;

    fn at(secs: i64) -> Timestamp {
        Timestamp::new(secs, 0).unwrap()
    }

    /// Runs every action and reports the same result each time.
    struct ScriptedDriver {
        result: DriveResult,
        executed: Vec<ActionId>,
    }

    impl ScriptedDriver {
        fn new(result: DriveResult) -> Self {
            Self {
                result,
                executed: Vec::new(),
            }
        }
    }

    impl InputDriver for ScriptedDriver {
        fn execute(&mut self, action: ActionId, _timeout: SignedDuration) -> DriveResult {
            self.executed.push(action);
            self.result.clone()
        }
    }

    /// Returns queued samples in order, repeating the last one forever.
    struct FixedPositions {
        samples: Vec<Option<(f64, f64)>>,
        next: usize,
    }

    impl FixedPositions {
        fn always(sample: Option<(f64, f64)>) -> Self {
            Self {
                samples: vec![sample],
                next: 0,
            }
        }

        fn sequence(samples: Vec<Option<(f64, f64)>>) -> Self {
            Self { samples, next: 0 }
        }
    }

    impl PositionSource for FixedPositions {
        fn sample(&mut self) -> Option<(f64, f64)> {
            let sample = self.samples[self.next.min(self.samples.len() - 1)];
            self.next += 1;
            sample
        }
    }

    #[derive(Default)]
    struct CollectingNotifier {
        events: Vec<TimelineEvent>,
    }

    impl Notifier for CollectingNotifier {
        fn notify(&mut self, event: &TimelineEvent) {
            self.events.push(event.clone());
        }
    }

    /// An engine whose buffer already shows a full-confidence stall.
    fn stuck_engine() -> RecoveryEngine {
        let mut engine = RecoveryEngine::new(EngineConfig::default()).unwrap();
        for i in 0..10 {
            engine.record_position(100.0, 100.0, at(i)).unwrap();
        }
        engine
    }

    #[test]
    fn calm_engine_takes_no_action() {
        let mut engine = RecoveryEngine::new(EngineConfig::default()).unwrap();
        let mut driver = ScriptedDriver::new(DriveResult::Completed);
        let mut positions = FixedPositions::always(Some((0.0, 0.0)));
        let mut harness = Harness {
            driver: &mut driver,
            positions: &mut positions,
            notifier: None,
        };

        let result = engine.tick(at(100), None, &mut harness);

        assert_eq!(result, TickResult::NoAction);
        assert!(driver.executed.is_empty());
        assert_eq!(engine.phase(), Phase::Idle);
    }

    #[test]
    fn low_confidence_verdict_does_not_trigger_recovery() {
        let mut engine = RecoveryEngine::new(EngineConfig::default()).unwrap();
        // Spread of 2.5 units: stalled-ish, confidence 0.5, under 0.7.
        for i in 0..10i64 {
            let x = if i % 2 == 0 { 0.0 } else { 2.5 };
            engine.record_position(x, 0.0, at(i)).unwrap();
        }
        let mut driver = ScriptedDriver::new(DriveResult::Completed);
        let mut positions = FixedPositions::always(Some((0.0, 0.0)));
        let mut harness = Harness {
            driver: &mut driver,
            positions: &mut positions,
            notifier: None,
        };

        assert_eq!(engine.tick(at(20), None, &mut harness), TickResult::NoAction);
        assert!(driver.executed.is_empty());
    }

    #[test]
    fn escalates_rung_by_rung_when_verification_fails() {
        let mut engine = stuck_engine();
        let mut driver = ScriptedDriver::new(DriveResult::Completed);
        // The agent never moves, so every verification fails.
        let mut positions = FixedPositions::always(Some((100.0, 100.0)));

        for i in 0..5 {
            let mut harness = Harness {
                driver: &mut driver,
                positions: &mut positions,
                notifier: None,
            };
            let result = engine.tick(at(20 + i), None, &mut harness);
            assert!(matches!(
                result,
                TickResult::ActionTaken {
                    outcome: Outcome::Failure,
                    ..
                }
            ));
        }

        assert_eq!(
            driver.executed,
            vec![
                ActionId::PathJitter,
                ActionId::MountToggle,
                ActionId::CameraRescan,
                ActionId::WaypointReturn,
                ActionId::ShuttleFallback,
            ]
        );
    }

    #[test]
    fn exhausting_the_ladder_reaches_safe_exit_with_one_notification() {
        let mut engine = stuck_engine();
        let mut driver = ScriptedDriver::new(DriveResult::Completed);
        let mut positions = FixedPositions::always(Some((100.0, 100.0)));
        let mut notifier = CollectingNotifier::default();

        let mut final_result = TickResult::NoAction;
        for i in 0..6 {
            let mut harness = Harness {
                driver: &mut driver,
                positions: &mut positions,
                notifier: Some(&mut notifier),
            };
            final_result = engine.tick(at(20 + i), None, &mut harness);
        }

        assert_eq!(final_result, TickResult::SafeExit);
        assert_eq!(engine.phase(), Phase::SafeExit);
        assert_eq!(driver.executed.len(), 6);
        assert_eq!(driver.executed[5], ActionId::SafeLogout);
        assert_eq!(notifier.events.len(), 1);
        assert_eq!(notifier.events[0].action, Some(ActionId::SafeLogout));

        // Terminal: further ticks do nothing.
        let mut harness = Harness {
            driver: &mut driver,
            positions: &mut positions,
            notifier: Some(&mut notifier),
        };
        assert_eq!(engine.tick(at(100), None, &mut harness), TickResult::SafeExit);
        assert_eq!(driver.executed.len(), 6);
        assert_eq!(notifier.events.len(), 1);
    }

    #[test]
    fn safety_ceiling_forces_safe_exit_before_the_ladder_ends() {
        let config = EngineConfig {
            max_recovery_attempts: 3,
            ..EngineConfig::default()
        };
        let mut engine = RecoveryEngine::new(config).unwrap();
        for i in 0..10 {
            engine.record_position(100.0, 100.0, at(i)).unwrap();
        }

        let mut driver = ScriptedDriver::new(DriveResult::Completed);
        let mut positions = FixedPositions::always(Some((100.0, 100.0)));
        let mut notifier = CollectingNotifier::default();

        let mut final_result = TickResult::NoAction;
        for i in 0..4 {
            let mut harness = Harness {
                driver: &mut driver,
                positions: &mut positions,
                notifier: Some(&mut notifier),
            };
            final_result = engine.tick(at(20 + i), None, &mut harness);
        }

        assert_eq!(final_result, TickResult::SafeExit);
        // Three ladder attempts, then the forced logout.
        assert_eq!(driver.executed.len(), 4);
        assert_eq!(driver.executed[3], ActionId::SafeLogout);
        assert_eq!(notifier.events.len(), 1);
    }

    #[test]
    fn all_rungs_cooling_down_logs_skipped_cooldown() {
        let playbook = Playbook::new(vec![ActionSpec {
            id: ActionId::PathJitter,
            rank: 0,
            cooldown_secs: 100,
            timeout_secs: 5,
            applies_to: vec![StuckKind::NoDelta],
        }])
        .unwrap();
        let mut engine =
            RecoveryEngine::with_playbook(EngineConfig::default(), playbook).unwrap();
        for i in 0..10 {
            engine.record_position(100.0, 100.0, at(i)).unwrap();
        }

        let mut driver = ScriptedDriver::new(DriveResult::Completed);
        let mut positions = FixedPositions::always(Some((100.0, 100.0)));
        let mut harness = Harness {
            driver: &mut driver,
            positions: &mut positions,
            notifier: None,
        };
        engine.tick(at(20), None, &mut harness);

        // The single rung is now cooling down.
        let mut harness = Harness {
            driver: &mut driver,
            positions: &mut positions,
            notifier: None,
        };
        let result = engine.tick(at(21), None, &mut harness);

        assert_eq!(result, TickResult::NoAction);
        assert_eq!(driver.executed.len(), 1);
        let last = engine.timeline().events().last().unwrap();
        assert_eq!(last.outcome, Some(Outcome::SkippedCooldown));
        assert_eq!(last.action, None);
    }

    #[test]
    fn verified_movement_counts_as_success_and_resets_state() {
        let mut engine = stuck_engine();
        let mut driver = ScriptedDriver::new(DriveResult::Completed);
        // Before: still at the stall point. After: well clear of it.
        let mut positions =
            FixedPositions::sequence(vec![Some((100.0, 100.0)), Some((160.0, 100.0))]);
        let mut harness = Harness {
            driver: &mut driver,
            positions: &mut positions,
            notifier: None,
        };

        let result = engine.tick(at(20), None, &mut harness);

        assert_eq!(
            result,
            TickResult::ActionTaken {
                action: ActionId::PathJitter,
                outcome: Outcome::Success,
            }
        );
        assert_eq!(engine.phase(), Phase::Idle);

        let snapshot = engine.snapshot(at(21));
        assert_eq!(snapshot.failure_streak, 0);
        assert_eq!(snapshot.attempts_in_window, 0);
    }

    #[test]
    fn driver_error_notifies_and_advances_the_streak() {
        let mut engine = stuck_engine();
        let mut driver = ScriptedDriver::new(DriveResult::Failed("input blocked".into()));
        let mut positions = FixedPositions::always(Some((100.0, 100.0)));
        let mut notifier = CollectingNotifier::default();
        let mut harness = Harness {
            driver: &mut driver,
            positions: &mut positions,
            notifier: Some(&mut notifier),
        };

        let result = engine.tick(at(20), None, &mut harness);

        assert!(matches!(
            result,
            TickResult::ActionTaken {
                outcome: Outcome::Error,
                ..
            }
        ));
        assert_eq!(notifier.events.len(), 1);
        assert_eq!(engine.snapshot(at(21)).failure_streak, 1);
    }

    #[test]
    fn abort_marks_the_outcome_skipped_but_starts_the_cooldown() {
        let mut engine = stuck_engine();
        engine.request_abort();

        let mut driver = ScriptedDriver::new(DriveResult::Completed);
        let mut positions = FixedPositions::always(Some((100.0, 100.0)));
        let mut harness = Harness {
            driver: &mut driver,
            positions: &mut positions,
            notifier: None,
        };
        let result = engine.tick(at(20), None, &mut harness);

        assert_eq!(
            result,
            TickResult::ActionTaken {
                action: ActionId::PathJitter,
                outcome: Outcome::Skipped,
            }
        );

        // The dispatch still started the rung's cooldown.
        let snapshot = engine.snapshot(at(21));
        assert!(snapshot
            .cooldowns
            .iter()
            .any(|c| c.action == ActionId::PathJitter));
        assert_eq!(snapshot.attempts_in_window, 1);
    }

    #[test]
    fn quest_stall_picks_a_rung_that_applies_to_it() {
        let mut engine = RecoveryEngine::new(EngineConfig::default()).unwrap();
        engine.record_quest_progress("gather_herbs", 2, at(0)).unwrap();

        let mut driver = ScriptedDriver::new(DriveResult::Completed);
        let mut positions = FixedPositions::always(Some((50.0, 50.0)));
        let mut harness = Harness {
            driver: &mut driver,
            positions: &mut positions,
            notifier: None,
        };
        // Stalled for twice the timeout: full confidence.
        let result = engine.tick(at(600), Some("gather_herbs"), &mut harness);

        assert!(matches!(result, TickResult::ActionTaken { .. }));
        // Jitter and mount don't apply to quest stalls.
        assert_eq!(driver.executed, vec![ActionId::CameraRescan]);
    }

    #[test]
    fn events_also_land_in_the_durable_session_log() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("sessions")).unwrap();
        let session = Session {
            id: uuid::Uuid::new_v4(),
            agent: "miner-03".into(),
            started_at: at(0),
        };
        storage.create_session(&session).unwrap();
        let log = storage.open_log(session.id).unwrap();

        let mut engine = stuck_engine().with_event_log(log);
        let mut driver = ScriptedDriver::new(DriveResult::Completed);
        let mut positions = FixedPositions::always(Some((100.0, 100.0)));
        let mut harness = Harness {
            driver: &mut driver,
            positions: &mut positions,
            notifier: None,
        };
        engine.tick(at(20), None, &mut harness);

        let persisted = storage.load_events(session.id).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].outcome, Some(Outcome::Failure));
        assert_eq!(persisted[0].kind, Some(StuckKind::NoDelta));
    }

    #[test]
    fn snapshot_seq_increases_with_every_mutation() {
        let mut engine = RecoveryEngine::new(EngineConfig::default()).unwrap();
        let seq_before = engine.snapshot(at(0)).seq;

        engine.record_position(1.0, 1.0, at(1)).unwrap();
        let seq_after = engine.snapshot(at(2)).seq;

        assert!(seq_after > seq_before);
    }

    #[test]
    fn snapshot_carries_recent_timeline_and_verdicts() {
        let mut engine = stuck_engine();
        let mut driver = ScriptedDriver::new(DriveResult::Completed);
        let mut positions = FixedPositions::always(Some((100.0, 100.0)));
        let mut harness = Harness {
            driver: &mut driver,
            positions: &mut positions,
            notifier: None,
        };
        engine.tick(at(20), None, &mut harness);

        let snapshot = engine.snapshot(at(21));
        assert_eq!(snapshot.phase, Phase::Recovering { kind: StuckKind::NoDelta });
        assert!(!snapshot.verdicts.is_empty());
        assert_eq!(snapshot.recent.len(), 1);
        assert_eq!(snapshot.attempts_in_window, 1);
    }
}
