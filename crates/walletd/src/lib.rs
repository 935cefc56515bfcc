//! Process lifecycle for the wallet service runner.
//!
//! A run starts the wallet service and, on request, a local console proxy,
//! each on its own background runner. The console is then opened in the
//! default browser or in a native view that occupies the calling thread.
//! Termination signals, an unexpected service exit or the view closing all
//! cancel the shared [`LifecycleContext`]; the [`Orchestrator`] then stops the
//! proxy before the wallet service, reporting every outcome through a
//! [`LifecycleReporter`].
//!
//! Failures after startup never change the result of [`run_service`]: they
//! are logged and summarised in the returned [`ShutdownReport`].

pub mod console;
mod launch;
mod lifecycle;
mod options;
mod orchestrator;
mod reporter;
mod runner;
mod service;
mod services;
mod signals;
mod telemetry;
pub mod transport;

pub use launch::{LaunchError, NATIVE_VIEW_AVAILABLE, run_service};
pub use lifecycle::{CancelCause, LifecycleContext, LifecycleState};
pub use options::{ConsoleMode, RunOptions};
pub use orchestrator::{Orchestrator, ShutdownReport, StopOutcome};
pub use reporter::{LifecycleReporter, StructuredLifecycleReporter};
pub use runner::ServiceRunner;
pub use service::{BoxedSource, Service, ServiceError};
pub use services::{
    CONSOLE_PROXY_NAME, ConsoleProxy, StatusHandler, WALLET_SERVICE_NAME, WalletService,
};
pub use signals::{SignalError, SignalSource, SignalWatcher, SystemSignals, TerminationSignal};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};

#[cfg(test)]
mod tests;
