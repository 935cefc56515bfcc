//! Error surface of the CLI runtime.

use std::sync::Arc;

use thiserror::Error;
use walletd::LaunchError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("--console-ui requires a build with the `webview` feature")]
    NativeViewUnavailable,
    #[error(transparent)]
    Launch(#[from] LaunchError),
}
