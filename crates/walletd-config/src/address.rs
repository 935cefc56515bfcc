use std::fmt;

use serde::{Deserialize, Serialize};

/// Host and port pair a TCP listener binds to or a relay connects to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct BindAddress {
    /// Hostname or IP literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl BindAddress {
    /// Builds an address from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns `true` when the host refers to the local machine.
    #[must_use]
    pub fn is_loopback(&self) -> bool {
        matches!(
            self.host.trim_start_matches('[').trim_end_matches(']'),
            "localhost" | "127.0.0.1" | "::1"
        )
    }

    /// Returns `true` when the host binds every local interface.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(
            self.host.trim_start_matches('[').trim_end_matches(']'),
            "0.0.0.0" | "::"
        )
    }
}

impl fmt::Display for BindAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(formatter, "[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "{}:{}", self.host, self.port)
        }
    }
}
