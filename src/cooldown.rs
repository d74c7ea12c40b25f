//! Cooldown and backoff bookkeeping for recovery actions.
//!
//! Each action gets a flat per-action cooldown from its spec. Repeated use
//! of the same action without a confirmed success in between multiplies
//! the next cooldown by the backoff factor, up to a ceiling — a failing
//! remedy gets progressively rarer instead of being hammered.

use std::collections::HashMap;

use jiff::{SignedDuration, Timestamp};

use crate::model::{ActionId, ActionSpec};

#[derive(Debug, Clone, Copy)]
struct Entry {
    available_at: Timestamp,

    /// Consecutive executions without an intervening confirmed success.
    streak: u32,
}

/// Tracks, per action, the earliest time it may run again.
///
/// Session-scoped: state resets when the owning process restarts.
#[derive(Debug)]
pub struct CooldownManager {
    entries: HashMap<ActionId, Entry>,
    backoff_factor: f64,
    ceiling_secs: i64,
}

impl CooldownManager {
    /// Creates a manager with the given backoff factor and cooldown ceiling.
    #[must_use]
    pub fn new(backoff_factor: f64, ceiling_secs: i64) -> Self {
        Self {
            entries: HashMap::new(),
            backoff_factor,
            ceiling_secs,
        }
    }

    /// Whether the action is off cooldown at `now`.
    #[must_use]
    pub fn is_available(&self, action: ActionId, now: Timestamp) -> bool {
        match self.entries.get(&action) {
            Some(entry) => now >= entry.available_at,
            None => true,
        }
    }

    /// Records an execution, starting the action's next exclusivity window.
    ///
    /// The effective cooldown is `base * factor^streak`, capped at the
    /// ceiling. Every dispatched attempt counts, whatever its outcome —
    /// even an aborted one was actually sent to the input driver.
    pub fn record_execution(&mut self, spec: &ActionSpec, now: Timestamp) {
        let streak = self
            .entries
            .get(&spec.id)
            .map_or(0, |entry| entry.streak);

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let secs = {
            let exponent = i32::try_from(streak).unwrap_or(i32::MAX);
            let scaled = spec.cooldown_secs as f64 * self.backoff_factor.powi(exponent);
            scaled.min(self.ceiling_secs as f64) as i64
        };

        let available_at = now
            .checked_add(SignedDuration::from_secs(secs))
            .unwrap_or(Timestamp::MAX);

        self.entries.insert(
            spec.id,
            Entry {
                available_at,
                streak: streak.saturating_add(1),
            },
        );
    }

    /// Resets the action's backoff streak after a confirmed success.
    ///
    /// The current exclusivity window is left in place — success does not
    /// make the action immediately re-runnable.
    pub fn record_success(&mut self, action: ActionId) {
        if let Some(entry) = self.entries.get_mut(&action) {
            entry.streak = 0;
        }
    }

    /// Time left until the action is available, or `None` if it already is.
    #[must_use]
    pub fn remaining(&self, action: ActionId, now: Timestamp) -> Option<SignedDuration> {
        let entry = self.entries.get(&action)?;
        (now < entry.available_at).then(|| entry.available_at.duration_since(now))
    }

    /// All actions currently cooling down, with time remaining.
    #[must_use]
    pub fn active(&self, now: Timestamp) -> Vec<(ActionId, SignedDuration)> {
        let mut active: Vec<(ActionId, SignedDuration)> = self
            .entries
            .iter()
            .filter(|(_, entry)| now < entry.available_at)
            .map(|(action, entry)| (*action, entry.available_at.duration_since(now)))
            .collect();
        active.sort_by_key(|(_, remaining)| *remaining);
        active
    }

    #[cfg(test)]
    fn available_at(&self, action: ActionId) -> Option<Timestamp> {
        self.entries.get(&action).map(|entry| entry.available_at)
    }
}
