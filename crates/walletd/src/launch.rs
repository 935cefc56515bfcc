//! Production wiring for `walletd service run`.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use walletd_config::{Config, ConfigError};

use crate::lifecycle::LIFECYCLE_TARGET;
use crate::options::RunOptions;
use crate::orchestrator::{Orchestrator, ShutdownReport};
use crate::reporter::{LifecycleReporter, StructuredLifecycleReporter};
use crate::services::{ConsoleProxy, WalletService};
use crate::signals::{SignalError, SystemSignals};
use crate::telemetry::{self, TelemetryError};

/// Whether this build can show the console in a native view.
pub const NATIVE_VIEW_AVAILABLE: bool = cfg!(feature = "webview");

/// Failures that prevent a run from starting.
///
/// Anything that goes wrong after startup is reported through the
/// [`ShutdownReport`] instead.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Telemetry could not be initialised.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The configuration is unusable.
    #[error("invalid configuration: {source}")]
    Config {
        /// Underlying validation error.
        #[source]
        source: ConfigError,
    },
    /// Signal handlers could not be installed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying signal error.
        #[source]
        source: SignalError,
    },
    /// A native view was requested from a build without one.
    #[error("the native console view is not available in this build")]
    NativeViewUnavailable,
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<ConfigError> for LaunchError {
    fn from(source: ConfigError) -> Self {
        Self::Config { source }
    }
}

impl From<SignalError> for LaunchError {
    fn from(source: SignalError) -> Self {
        Self::Signals { source }
    }
}

/// Runs the wallet service with the production collaborators.
///
/// Returns once the run has been cancelled and every started component has
/// been stopped. Only pre-startup failures are returned as errors.
pub fn run_service(config: &Config, options: RunOptions) -> Result<ShutdownReport, LaunchError> {
    telemetry::initialise(config)?;
    config.validate()?;
    if options.enable_native_ui && !NATIVE_VIEW_AVAILABLE {
        return Err(LaunchError::NativeViewUnavailable);
    }
    let signals = SystemSignals::install()?;

    let reporter: Arc<dyn LifecycleReporter> = Arc::new(StructuredLifecycleReporter::new());
    let wallet = Arc::new(WalletService::from_config(config));
    let mut orchestrator = Orchestrator::new(wallet, reporter);
    if options.proxy_required() {
        let proxy = ConsoleProxy::from_config(config)?;
        let browser_url = proxy.browser_url().clone();
        orchestrator = orchestrator.with_proxy(Arc::new(proxy), browser_url);
    }

    let report = orchestrator.run(options, signals);
    info!(
        target: LIFECYCLE_TARGET,
        cause = %report.cause,
        clean = report.stopped_cleanly(),
        "run finished"
    );
    Ok(report)
}
