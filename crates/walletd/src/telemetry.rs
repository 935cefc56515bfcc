//! Structured log output for a run.
//!
//! Events go to stderr as JSON or compact lines. Runner, watcher and relay
//! threads are named, so thread names are always recorded. The embedded
//! view's windowing crates are quietened to `warn` unless the configured
//! filter mentions them.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use walletd_config::{Config, LogFormat};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

const QUIET_TARGETS: [&str; 2] = ["tao", "wry"];

/// Proof that the global subscriber is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter directive did not parse.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// Offending directive.
        filter: String,
        /// Parser message.
        message: String,
    },
    /// Another subscriber already owns the global default.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[source] TryInitError),
}

/// Installs the global `tracing` subscriber on first use.
///
/// Later calls return a handle without touching global state.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install(config))
        .map(|()| TelemetryHandle)
}

fn install(config: &Config) -> Result<(), TelemetryError> {
    let filter = parse_filter(&config.log_filter)?;
    Registry::default()
        .with(output_layer(config.log_format).with_filter(filter))
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

fn output_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339())
        .with_thread_names(true)
        .with_target(true);
    match format {
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

fn parse_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    let invalid = |message: String| TelemetryError::Filter {
        filter: directive.to_owned(),
        message,
    };
    let mut filter = EnvFilter::try_new(directive).map_err(|error| invalid(error.to_string()))?;
    for target in QUIET_TARGETS {
        if directive.contains(target) {
            continue;
        }
        let quiet = format!("{target}=warn")
            .parse::<Directive>()
            .map_err(|error| invalid(error.to_string()))?;
        filter = filter.add_directive(quiet);
    }
    Ok(filter)
}
