//! Stuck detection and recovery for automated game-play agents.
//!
//! The owning agent loop feeds observable signals — positions, clicks,
//! quest progress — into a [`RecoveryEngine`] and calls
//! [`tick`](RecoveryEngine::tick) periodically. Four independent
//! detectors judge whether the agent has gone non-productive; when one
//! fires with enough confidence, the engine walks an escalating ladder
//! of corrective actions, backing off remedies that fail, until the
//! condition clears or a safe logout ends the session.
//!
//! The engine never decides *what* the agent should be doing. It only
//! notices that the current execution has stalled, and tries to unstick
//! it.

pub mod config;
pub mod cooldown;
pub mod detect;
pub mod drive;
pub mod engine;
pub mod model;
pub mod shared;
pub mod signals;
pub mod status;
pub mod storage;
pub mod timeline;

pub use config::{ConfigError, EngineConfig};
pub use drive::{DriveResult, InputDriver, Notifier, PositionSource};
pub use engine::{Harness, PendingAction, Phase, Plan, RecoveryEngine, TickResult};
pub use model::{
    ActionId, ActionSpec, ClickEvent, Evidence, Outcome, Playbook, PlaybookError, Point,
    PositionSample, QuestProgress, Session, StuckKind, TimelineEvent, Verdict,
};
pub use shared::SharedEngine;
pub use signals::{InvalidSignalError, SignalBuffer};
pub use status::{CooldownStatus, StatusSnapshot};
pub use storage::{EventLog, Storage, StorageError};
pub use timeline::{Timeline, TimelineSummary};
