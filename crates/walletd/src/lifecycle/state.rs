use std::fmt;

/// Phases an orchestrated run moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Nothing has started yet.
    Idle,
    /// Background services are being launched.
    Starting,
    /// Everything requested is up; the foreground path is occupied.
    Running,
    /// Cancellation was observed and services are being stopped.
    Cancelling,
    /// Shutdown completed.
    Stopped,
}

impl LifecycleState {
    /// Stable label used in structured logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Cancelling => "cancelling",
            Self::Stopped => "stopped",
        }
    }

    /// State that legally follows this one, or `None` when terminal.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Starting),
            Self::Starting => Some(Self::Running),
            Self::Running => Some(Self::Cancelling),
            Self::Cancelling => Some(Self::Stopped),
            Self::Stopped => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
