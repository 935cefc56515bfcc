//! The two concrete services a run can start.

use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use url::Url;
use walletd_config::{Config, ConfigError};

use crate::service::{Service, ServiceError};
use crate::transport::{ConnectionHandler, RelayHandler, TRANSPORT_TARGET, TcpServer};

/// Component name of the primary service.
pub const WALLET_SERVICE_NAME: &str = "wallet service";
/// Component name of the console proxy.
pub const CONSOLE_PROXY_NAME: &str = "console proxy";

#[derive(Debug, Serialize)]
struct StatusLine<'a> {
    status: &'a str,
    service: &'a str,
    version: &'a str,
}

/// Answers every connection with a single JSON status line.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusHandler;

impl ConnectionHandler for StatusHandler {
    fn handle(&self, mut stream: TcpStream) {
        let line = StatusLine {
            status: "ok",
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        };
        let written = serde_json::to_vec(&line)
            .map_err(std::io::Error::other)
            .and_then(|mut payload| {
                payload.push(b'\n');
                stream.write_all(&payload)
            });
        if let Err(error) = written {
            debug!(target: TRANSPORT_TARGET, error = %error, "failed to write status line");
        }
    }
}

/// Primary wallet service.
#[derive(Debug)]
pub struct WalletService {
    server: TcpServer,
}

impl WalletService {
    /// Builds the service on the configured address.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            server: TcpServer::new(
                WALLET_SERVICE_NAME,
                config.service_address(),
                Arc::new(StatusHandler),
            ),
        }
    }

    /// Bound address once listening.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }
}

impl Service for WalletService {
    fn name(&self) -> &str {
        self.server.name()
    }

    fn start(&self) -> Result<(), ServiceError> {
        self.server.start()
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.server.stop()
    }
}

/// Local proxy that fronts the upstream console.
#[derive(Debug)]
pub struct ConsoleProxy {
    server: TcpServer,
    browser_url: Url,
}

impl ConsoleProxy {
    /// Builds the proxy from the console settings.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let upstream = config.console_upstream_address()?;
        let browser_url = config.proxy_browser_url()?;
        Ok(Self {
            server: TcpServer::new(
                CONSOLE_PROXY_NAME,
                config.console_address(),
                Arc::new(RelayHandler::new(upstream)),
            ),
            browser_url,
        })
    }

    /// URL through which a browser or view reaches the console.
    #[must_use]
    pub fn browser_url(&self) -> &Url {
        &self.browser_url
    }

    /// Bound address once listening.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr()
    }
}

impl Service for ConsoleProxy {
    fn name(&self) -> &str {
        self.server.name()
    }

    fn start(&self) -> Result<(), ServiceError> {
        self.server.start()
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.server.stop()
    }
}
