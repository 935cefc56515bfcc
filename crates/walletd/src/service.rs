//! The contract every supervised background component implements.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use walletd_config::BindAddress;

/// Boxed error carried by [`ServiceError::Failed`].
pub type BoxedSource = Box<dyn StdError + Send + Sync>;

/// Long-running component with a blocking start and an explicit stop.
///
/// `start` blocks for the component's whole lifetime. After `stop` has been
/// requested it must return [`ServiceError::Closed`]; any other outcome is
/// treated as an unexpected exit by the runner. `stop` must return promptly
/// and only asks the component to wind down.
pub trait Service: Send + Sync {
    /// Human-readable component name used in logs.
    fn name(&self) -> &str;

    /// Runs the component until it is stopped or fails.
    fn start(&self) -> Result<(), ServiceError>;

    /// Requests a graceful stop.
    fn stop(&self) -> Result<(), ServiceError>;
}

/// Errors produced by services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service was closed on request. Not a failure.
    #[error("service closed")]
    Closed,
    /// The listen address could not be resolved.
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        /// Address being resolved.
        address: BindAddress,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The address resolved to nothing.
    #[error("address {address} did not resolve to any socket address")]
    NoAddress {
        /// Address being resolved.
        address: BindAddress,
    },
    /// Binding the listener failed.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address being bound.
        address: BindAddress,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The bound listener could not be configured.
    #[error("failed to configure listener on {address}: {source}")]
    Listener {
        /// Bound address.
        address: BindAddress,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Any other failure reported by a service implementation.
    #[error("{message}")]
    Failed {
        /// Human-readable description.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<BoxedSource>,
    },
}

impl ServiceError {
    /// Builds a failure without an underlying source.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a failure wrapping an underlying source.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self::Failed {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns `true` for the distinguished clean-close result.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
