//! Layered configuration for the wallet service runner.
//!
//! Values are merged by `ortho_config` from built-in defaults, an optional
//! configuration file, `WALLETD_*` environment variables and command-line
//! flags, in increasing order of precedence. The resulting [`Config`] is
//! immutable for the lifetime of a run and only exposes derived views (bind
//! addresses, the console upstream and the proxy's browser URL) that the
//! runtime needs.

mod address;
pub mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use address::BindAddress;
pub use defaults::{
    DEFAULT_CONSOLE_PORT, DEFAULT_CONSOLE_URL, DEFAULT_LOG_FILTER, DEFAULT_SERVICE_HOST,
    DEFAULT_SERVICE_PORT, PROXY_HOST,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "WALLETD")]
pub struct Config {
    /// Host the wallet service binds to.
    #[serde(default = "defaults::default_service_host")]
    pub service_host: String,
    /// Port the wallet service listens on.
    #[serde(default = "defaults::default_service_port")]
    pub service_port: u16,
    /// Local port of the console proxy.
    #[serde(default = "defaults::default_console_port")]
    pub console_port: u16,
    /// Upstream console the proxy relays to.
    #[serde(default = "defaults::default_console_url")]
    pub console_url: String,
    /// `tracing` filter directive.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_host: defaults::default_service_host(),
            service_port: DEFAULT_SERVICE_PORT,
            console_port: DEFAULT_CONSOLE_PORT,
            console_url: defaults::default_console_url(),
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
        }
    }
}

/// Errors reported when a loaded configuration is unusable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The console URL could not be parsed.
    #[error("invalid console url '{url}': {source}")]
    InvalidConsoleUrl {
        /// Offending value.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// The console URL has no host to relay to.
    #[error("console url '{url}' has no host")]
    MissingConsoleHost {
        /// Offending value.
        url: String,
    },
    /// The console URL uses a scheme without a known default port.
    #[error("console url '{url}' has no port and scheme '{scheme}' has no default")]
    MissingConsolePort {
        /// Offending value.
        url: String,
        /// Scheme found in the URL.
        scheme: String,
    },
    /// The console proxy relays raw bytes and cannot terminate other schemes.
    #[error("console url '{url}' uses unsupported scheme '{scheme}'; only http is relayed")]
    UnsupportedConsoleScheme {
        /// Offending value.
        url: String,
        /// Scheme found in the URL.
        scheme: String,
    },
    /// The proxy and the wallet service would listen on the same socket.
    #[error("console proxy port {port} collides with the wallet service on {host}")]
    PortCollision {
        /// Shared host.
        host: String,
        /// Shared port.
        port: u16,
    },
}

impl Config {
    /// Address the wallet service binds to.
    #[must_use]
    pub fn service_address(&self) -> BindAddress {
        BindAddress::new(self.service_host.clone(), self.service_port)
    }

    /// Address the console proxy binds to.
    #[must_use]
    pub fn console_address(&self) -> BindAddress {
        BindAddress::new(PROXY_HOST, self.console_port)
    }

    /// Parses the upstream console URL.
    pub fn console_upstream(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.console_url).map_err(|source| ConfigError::InvalidConsoleUrl {
            url: self.console_url.clone(),
            source,
        })
    }

    /// Host and port the proxy relays connections to.
    pub fn console_upstream_address(&self) -> Result<BindAddress, ConfigError> {
        let url = self.console_upstream()?;
        let Some(host) = url.host_str() else {
            return Err(ConfigError::MissingConsoleHost {
                url: self.console_url.clone(),
            });
        };
        let Some(port) = url.port_or_known_default() else {
            return Err(ConfigError::MissingConsolePort {
                url: self.console_url.clone(),
                scheme: url.scheme().to_owned(),
            });
        };
        Ok(BindAddress::new(host, port))
    }

    /// URL a browser or native view uses to reach the console through the proxy.
    ///
    /// The path and query of the configured console URL are preserved so the
    /// operator lands on the same page they would reach upstream.
    pub fn proxy_browser_url(&self) -> Result<Url, ConfigError> {
        let upstream = self.console_upstream()?;
        let local = format!("http://{}:{}/", PROXY_HOST, self.console_port);
        let mut proxied = Url::parse(&local).map_err(|source| ConfigError::InvalidConsoleUrl {
            url: local.clone(),
            source,
        })?;
        proxied.set_path(upstream.path());
        proxied.set_query(upstream.query());
        Ok(proxied)
    }

    /// Checks the derived views before any listener is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.console_upstream_address()?;
        let upstream = self.console_upstream()?;
        if upstream.scheme() != "http" {
            return Err(ConfigError::UnsupportedConsoleScheme {
                url: self.console_url.clone(),
                scheme: upstream.scheme().to_owned(),
            });
        }
        let service = self.service_address();
        let console = self.console_address();
        // Port 0 asks the OS for a fresh ephemeral port on each bind.
        let shares_port = service.port != 0 && service.port == console.port;
        if shares_port && (service.is_loopback() || service.is_wildcard()) {
            return Err(ConfigError::PortCollision {
                host: service.host,
                port: service.port,
            });
        }
        Ok(())
    }
}
