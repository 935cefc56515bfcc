//! Shared cancellation for a single run of the service runner.
//!
//! A [`LifecycleContext`] is created once per run and cloned into every
//! background thread. Any holder may request cancellation; the first request
//! records its [`CancelCause`] and wakes every waiter, later requests are
//! ignored.

mod state;

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info};

use crate::signals::TerminationSignal;

pub use state::LifecycleState;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Reason the run was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelCause {
    /// The operator sent a termination signal.
    Signal(TerminationSignal),
    /// A component's blocking start returned an error.
    ComponentFailed {
        /// Component name.
        component: String,
        /// Rendered error.
        message: String,
    },
    /// A component's blocking start returned although nobody asked it to stop.
    ComponentExited {
        /// Component name.
        component: String,
    },
    /// The native console view was closed.
    ViewClosed,
    /// The native console view could not be created or its run loop failed.
    ViewFailed {
        /// Rendered error.
        message: String,
    },
    /// A background thread could not be spawned.
    Spawn {
        /// Thread role.
        role: String,
        /// Rendered error.
        message: String,
    },
}

impl fmt::Display for CancelCause {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => write!(formatter, "received {signal}"),
            Self::ComponentFailed { component, message } => {
                write!(formatter, "{component} failed: {message}")
            }
            Self::ComponentExited { component } => {
                write!(formatter, "{component} exited unexpectedly")
            }
            Self::ViewClosed => formatter.write_str("console view closed"),
            Self::ViewFailed { message } => write!(formatter, "console view failed: {message}"),
            Self::Spawn { role, message } => {
                write!(formatter, "failed to spawn {role} thread: {message}")
            }
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    cause: Mutex<Option<CancelCause>>,
    cancelled: Condvar,
}

/// Broadcast, one-shot cancellation token.
#[derive(Debug, Clone, Default)]
pub struct LifecycleContext {
    shared: Arc<Shared>,
}

impl LifecycleContext {
    /// Creates an uncancelled context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    ///
    /// Returns `true` when this call performed the cancellation and `false`
    /// when the context had already been cancelled; the original cause is
    /// kept in that case.
    pub fn cancel(&self, cause: CancelCause) -> bool {
        let mut slot = self.lock();
        if let Some(existing) = slot.as_ref() {
            debug!(
                target: LIFECYCLE_TARGET,
                existing = %existing,
                ignored = %cause,
                "cancellation already requested"
            );
            return false;
        }
        info!(
            target: LIFECYCLE_TARGET,
            cause = %cause,
            "cancelling run"
        );
        *slot = Some(cause);
        self.shared.cancelled.notify_all();
        true
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.lock().is_some()
    }

    /// Returns the recorded cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<CancelCause> {
        self.lock().clone()
    }

    /// Blocks until the context is cancelled and returns the cause.
    pub fn wait(&self) -> CancelCause {
        let mut slot = self.lock();
        loop {
            if let Some(cause) = slot.as_ref() {
                return cause.clone();
            }
            slot = self
                .shared
                .cancelled
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks for at most `timeout`, returning the cause if cancelled by then.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<CancelCause> {
        let slot = self.lock();
        let (slot, _) = self
            .shared
            .cancelled
            .wait_timeout_while(slot, timeout, |cause| cause.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<CancelCause>> {
        self.shared
            .cause
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
