//! The execution boundary: contracts the host environment implements.
//!
//! The engine decides *which* recovery action to run; it has no idea how
//! "toggle mount" is injected into the game. The driver must treat every
//! call as bounded — if the action has not finished within the timeout it
//! reports [`DriveResult::TimedOut`] rather than blocking the tick.

use jiff::SignedDuration;

use crate::model::{ActionId, TimelineEvent};

/// What came back from dispatching an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveResult {
    /// The driver carried the action out. Verification still decides
    /// whether it actually helped.
    Completed,

    /// The driver could not perform the action.
    Failed(String),

    /// The action did not finish within the allotted timeout.
    TimedOut,
}

/// Low-level input and movement execution.
pub trait InputDriver {
    /// Performs the action, returning within `timeout`.
    fn execute(&mut self, action: ActionId, timeout: SignedDuration) -> DriveResult;
}

/// On-demand position reads, polled for verification snapshots.
pub trait PositionSource {
    /// The current position, or `None` when it cannot be read right now.
    fn sample(&mut self) -> Option<(f64, f64)>;
}

/// Outbound notification hook.
///
/// Invoked on safe exit and on every `Error` outcome. The transport
/// (chat, webhook) is entirely the host's concern.
pub trait Notifier {
    fn notify(&mut self, event: &TimelineEvent);
}

impl<F: FnMut(&TimelineEvent)> Notifier for F {
    fn notify(&mut self, event: &TimelineEvent) {
        self(event);
    }
}
