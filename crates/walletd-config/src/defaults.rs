//! Default values shared by the configuration loader and the binaries.

use crate::logging::LogFormat;

/// Host the wallet service binds to when nothing else is configured.
pub const DEFAULT_SERVICE_HOST: &str = "127.0.0.1";

/// Port the wallet service listens on by default.
pub const DEFAULT_SERVICE_PORT: u16 = 1789;

/// Local port the console proxy listens on by default.
pub const DEFAULT_CONSOLE_PORT: u16 = 1847;

/// Upstream console relayed by the proxy by default.
pub const DEFAULT_CONSOLE_URL: &str = "http://127.0.0.1:3000";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Host the console proxy binds to. The proxy is only reachable locally.
pub const PROXY_HOST: &str = "127.0.0.1";

/// Owned service host used by serde when the field is absent.
#[must_use]
pub fn default_service_host() -> String {
    DEFAULT_SERVICE_HOST.to_owned()
}

/// Service port used by serde when the field is absent.
#[must_use]
pub const fn default_service_port() -> u16 {
    DEFAULT_SERVICE_PORT
}

/// Console proxy port used by serde when the field is absent.
#[must_use]
pub const fn default_console_port() -> u16 {
    DEFAULT_CONSOLE_PORT
}

/// Owned console URL used by serde when the field is absent.
#[must_use]
pub fn default_console_url() -> String {
    DEFAULT_CONSOLE_URL.to_owned()
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
