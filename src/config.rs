//! Engine configuration.
//!
//! Every threshold the detectors and executor use, with serde defaults so
//! a TOML file only needs to name what it overrides. An invalid
//! configuration is fatal at startup — the engine refuses to run with
//! thresholds that would make detection or escalation meaningless.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::detect::Thresholds;

/// Errors raised while loading or validating configuration. Fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Tuning for detection, escalation, and the safety ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    /// Position samples kept and required by the coordinate-stall detector.
    pub position_window: usize,

    /// Click events kept in the rolling window.
    pub click_capacity: usize,

    /// Spread (world units) under which the agent counts as not moving.
    /// Also the displacement that verifies a recovery as successful.
    pub coordinate_delta_threshold: f64,

    /// Movement small enough to not break a consecutive-click run.
    pub jitter_tolerance: f64,

    /// Consecutive identical clicks before the repeat-click detector fires.
    pub repeat_click_threshold: u32,

    /// Seconds without quest progress before the quest-stall detector fires.
    pub quest_progress_timeout_secs: i64,

    /// Position samples inspected by the oscillation detector.
    pub oscillation_window: usize,

    /// Radius (world units) within which samples share a cluster.
    pub cluster_radius: f64,

    /// Verdicts below this confidence never trigger recovery.
    pub min_confidence: f64,

    /// Confidence gap under which the fixed priority order breaks ties.
    pub confidence_epsilon: f64,

    /// Cooldown multiplier per consecutive use without a success.
    pub backoff_factor: f64,

    /// Longest cooldown backoff may reach, in seconds.
    pub cooldown_ceiling_secs: i64,

    /// Failed attempts inside the rolling window before forced safe exit.
    pub max_recovery_attempts: u32,

    /// Length of the safety ceiling's rolling window, in seconds.
    pub attempt_window_secs: i64,

    /// Timeline events included in a status snapshot.
    pub status_recent_events: usize,

    /// Also record idle evaluations in the timeline, for audit.
    pub log_evaluations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            position_window: 10,
            click_capacity: 30,
            coordinate_delta_threshold: 5.0,
            jitter_tolerance: 1.0,
            repeat_click_threshold: 5,
            quest_progress_timeout_secs: 300,
            oscillation_window: 6,
            cluster_radius: 3.0,
            min_confidence: 0.7,
            confidence_epsilon: 0.05,
            backoff_factor: 2.0,
            cooldown_ceiling_secs: 3600,
            max_recovery_attempts: 6,
            attempt_window_secs: 600,
            status_recent_events: 20,
            log_evaluations: false,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file and validates it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks every threshold for a value the engine could not act on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &'static str| ConfigError::Invalid { field, reason };

        if self.position_window < 2 {
            return Err(invalid("position-window", "must be at least 2"));
        }
        if self.oscillation_window < 2 {
            return Err(invalid("oscillation-window", "must be at least 2"));
        }
        if self.oscillation_window > self.position_window {
            return Err(invalid(
                "oscillation-window",
                "cannot exceed position-window, or oscillation never fires",
            ));
        }
        if self.click_capacity == 0 {
            return Err(invalid("click-capacity", "must be positive"));
        }
        if self.coordinate_delta_threshold <= 0.0 {
            return Err(invalid("coordinate-delta-threshold", "must be positive"));
        }
        if self.jitter_tolerance < 0.0 {
            return Err(invalid("jitter-tolerance", "cannot be negative"));
        }
        if self.repeat_click_threshold == 0 {
            return Err(invalid("repeat-click-threshold", "must be positive"));
        }
        if self.quest_progress_timeout_secs <= 0 {
            return Err(invalid("quest-progress-timeout-secs", "must be positive"));
        }
        if self.cluster_radius <= 0.0 {
            return Err(invalid("cluster-radius", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(invalid("min-confidence", "must be within [0, 1]"));
        }
        if self.confidence_epsilon < 0.0 {
            return Err(invalid("confidence-epsilon", "cannot be negative"));
        }
        if self.backoff_factor < 1.0 {
            return Err(invalid("backoff-factor", "must be at least 1"));
        }
        if self.cooldown_ceiling_secs <= 0 {
            return Err(invalid("cooldown-ceiling-secs", "must be positive"));
        }
        if self.max_recovery_attempts == 0 {
            return Err(invalid("max-recovery-attempts", "must be positive"));
        }
        if self.attempt_window_secs <= 0 {
            return Err(invalid("attempt-window-secs", "must be positive"));
        }

        Ok(())
    }

    /// The detector-facing slice of this configuration.
    pub(crate) fn thresholds(&self) -> Thresholds {
        Thresholds {
            position_window: self.position_window,
            coordinate_delta: self.coordinate_delta_threshold,
            repeat_click: self.repeat_click_threshold,
            quest_timeout_secs: self.quest_progress_timeout_secs,
            oscillation_window: self.oscillation_window,
            cluster_radius: self.cluster_radius,
        }
    }
}
