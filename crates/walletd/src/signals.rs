//! Termination signal handling.
//!
//! The watcher runs on its own thread and polls the installed signal source
//! between short waits on the lifecycle context, so it returns promptly both
//! when a signal arrives and when something else cancelled the run.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use signal_hook::consts::signal::{SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::debug;

use crate::console::ViewTerminator;
use crate::lifecycle::{CancelCause, LifecycleContext};
use crate::reporter::LifecycleReporter;

pub(crate) const SIGNALS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::signals");
const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Signals that request an orderly shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationSignal {
    /// `SIGINT`, usually Ctrl-C.
    Interrupt,
    /// `SIGTERM`, sent by supervisors.
    Terminate,
    /// `SIGQUIT`.
    Quit,
}

impl TerminationSignal {
    /// Every signal the watcher registers for.
    pub const ALL: [Self; 3] = [Self::Interrupt, Self::Terminate, Self::Quit];

    /// Maps a raw signal number onto a termination signal.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            SIGINT => Some(Self::Interrupt),
            SIGTERM => Some(Self::Terminate),
            SIGQUIT => Some(Self::Quit),
            _ => None,
        }
    }

    /// Raw signal number.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Interrupt => SIGINT,
            Self::Terminate => SIGTERM,
            Self::Quit => SIGQUIT,
        }
    }

    /// Conventional signal name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Quit => "SIGQUIT",
        }
    }
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Errors reported while installing or running the signal watcher.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The watcher thread could not be spawned.
    #[error("failed to spawn signal watcher: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Non-blocking source of termination signals.
pub trait SignalSource: Send {
    /// Returns a pending termination signal without blocking.
    fn try_next(&mut self) -> Option<TerminationSignal>;
}

/// Signal source backed by process-wide `signal-hook` handlers.
pub struct SystemSignals {
    signals: Signals,
}

impl SystemSignals {
    /// Registers handlers for every [`TerminationSignal`].
    ///
    /// Installing early replaces the default disposition, so a signal that
    /// arrives before the watcher starts is queued instead of killing the
    /// process.
    pub fn install() -> Result<Self, SignalError> {
        let signals = Signals::new(TerminationSignal::ALL.map(TerminationSignal::as_raw))
            .map_err(|source| SignalError::Install { source })?;
        Ok(Self { signals })
    }
}

impl fmt::Debug for SystemSignals {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("SystemSignals").finish_non_exhaustive()
    }
}

impl SignalSource for SystemSignals {
    fn try_next(&mut self) -> Option<TerminationSignal> {
        self.signals.pending().find_map(TerminationSignal::from_raw)
    }
}

/// Handle to the background signal watcher.
#[derive(Debug)]
pub struct SignalWatcher {
    thread: JoinHandle<()>,
}

impl SignalWatcher {
    /// Starts watching `source` until a signal arrives or `context` is cancelled.
    ///
    /// When a signal arrives the context is cancelled and the active console
    /// view, if any, is terminated.
    pub fn spawn<S>(
        source: S,
        context: LifecycleContext,
        reporter: Arc<dyn LifecycleReporter>,
        view: Option<Arc<dyn ViewTerminator>>,
    ) -> Result<Self, SignalError>
    where
        S: SignalSource + 'static,
    {
        let thread = thread::Builder::new()
            .name("signal-watcher".to_owned())
            .spawn(move || watch(source, &context, reporter.as_ref(), view.as_deref()))
            .map_err(|source| SignalError::Spawn { source })?;
        Ok(Self { thread })
    }

    /// Waits for the watcher thread to finish.
    pub fn join(self) {
        if self.thread.join().is_err() {
            debug!(target: SIGNALS_TARGET, "signal watcher panicked");
        }
    }
}

fn watch<S>(
    mut source: S,
    context: &LifecycleContext,
    reporter: &dyn LifecycleReporter,
    view: Option<&dyn ViewTerminator>,
) where
    S: SignalSource,
{
    loop {
        if let Some(signal) = source.try_next() {
            reporter.signal_received(signal);
            // The signal must be recorded as the cause before the view closes.
            context.cancel(CancelCause::Signal(signal));
            if let Some(view) = view {
                view.terminate();
            }
            return;
        }
        if context.wait_timeout(SIGNAL_POLL_INTERVAL).is_some() {
            debug!(
                target: SIGNALS_TARGET,
                "run cancelled elsewhere; signal watcher exiting"
            );
            return;
        }
    }
}
