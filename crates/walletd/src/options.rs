//! Per-run switches derived from the command line.

/// How the console is presented once the proxy is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMode {
    /// No console is opened.
    Disabled,
    /// The proxy URL is handed to the default browser.
    Browser,
    /// The proxy URL is shown in an embedded native view.
    NativeView,
}

/// Immutable options for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    /// Start the console proxy.
    pub enable_proxy: bool,
    /// Show the console in a native view instead of the browser.
    pub enable_native_ui: bool,
}

impl RunOptions {
    /// Builds options from the `--console-proxy` and `--console-ui` flags.
    ///
    /// The native view implies the proxy.
    #[must_use]
    pub const fn from_flags(console_proxy: bool, console_ui: bool) -> Self {
        Self {
            enable_proxy: console_proxy || console_ui,
            enable_native_ui: console_ui,
        }
    }

    /// Returns `true` when the console proxy must be started.
    #[must_use]
    pub const fn proxy_required(self) -> bool {
        self.enable_proxy || self.enable_native_ui
    }

    /// Presentation strategy for this run.
    #[must_use]
    pub const fn console_mode(self) -> ConsoleMode {
        match (self.proxy_required(), self.enable_native_ui) {
            (false, _) => ConsoleMode::Disabled,
            (true, true) => ConsoleMode::NativeView,
            (true, false) => ConsoleMode::Browser,
        }
    }
}
