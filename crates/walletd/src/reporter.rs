//! Structured reporting of lifecycle events.

use url::Url;

use crate::console::{BrowserError, ViewError};
use crate::lifecycle::{LIFECYCLE_TARGET, LifecycleState};
use crate::service::ServiceError;
use crate::signals::TerminationSignal;

/// Observer for everything the orchestrator and its helpers log.
pub trait LifecycleReporter: Send + Sync {
    /// The orchestrator entered `state`.
    fn state_changed(&self, state: LifecycleState);

    /// A runner is about to call `start` on `component`.
    fn component_starting(&self, component: &str);

    /// `component` returned its clean-close result after a requested stop.
    fn component_stopped(&self, component: &str);

    /// `component` returned cleanly although no stop had been requested.
    fn component_exited(&self, component: &str);

    /// `component` failed while running.
    fn component_failed(&self, component: &str, error: &ServiceError);

    /// A termination signal arrived.
    fn signal_received(&self, signal: TerminationSignal);

    /// The default browser could not be opened.
    fn browser_open_failed(&self, url: &Url, error: &BrowserError);

    /// The console view failed to open or its run loop failed.
    fn view_failed(&self, error: &ViewError);

    /// `stop` on `component` succeeded.
    fn stop_succeeded(&self, component: &str);

    /// `stop` on `component` failed.
    fn stop_failed(&self, component: &str, error: &ServiceError);
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn state_changed(&self, state: LifecycleState) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "state_changed",
            state = %state,
            "lifecycle state changed"
        );
    }

    fn component_starting(&self, component: &str) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "component_starting",
            component,
            "starting component"
        );
    }

    fn component_stopped(&self, component: &str) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "component_stopped",
            component,
            "component closed"
        );
    }

    fn component_exited(&self, component: &str) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "component_exited",
            component,
            "component exited without a stop request"
        );
    }

    fn component_failed(&self, component: &str, error: &ServiceError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "component_failed",
            component,
            error = %error,
            "component failed"
        );
    }

    fn signal_received(&self, signal: TerminationSignal) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "signal_received",
            signal = signal.name(),
            "caught signal"
        );
    }

    fn browser_open_failed(&self, url: &Url, error: &BrowserError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "browser_open_failed",
            url = %url,
            error = %error,
            "unable to open the console in the default browser"
        );
    }

    fn view_failed(&self, error: &ViewError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "view_failed",
            error = %error,
            "console view failed"
        );
    }

    fn stop_succeeded(&self, component: &str) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "stop_succeeded",
            component,
            "component stopped with success"
        );
    }

    fn stop_failed(&self, component: &str, error: &ServiceError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "stop_failed",
            component,
            error = %error,
            "error stopping component"
        );
    }
}
