//! Drives one run from startup to ordered shutdown.
//!
//! The orchestrator starts the wallet service and, when requested, the
//! console proxy on background runners, opens the console, and then waits on
//! the [`LifecycleContext`]. Whatever cancels the context, shutdown always
//! stops the proxy before the wallet service and reports each outcome
//! without escalating it.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::console::{
    BrowserOpener, SystemBrowser, UiLauncher, ViewFactory, default_view_factory,
};
use crate::lifecycle::{CancelCause, LIFECYCLE_TARGET, LifecycleContext, LifecycleState};
use crate::options::{ConsoleMode, RunOptions};
use crate::reporter::LifecycleReporter;
use crate::runner::ServiceRunner;
use crate::service::{Service, ServiceError};
use crate::signals::{SignalSource, SignalWatcher};

/// Result of stopping one component.
#[derive(Debug)]
pub struct StopOutcome {
    /// Component name.
    pub component: String,
    /// Result of the component's `stop`.
    pub result: Result<(), ServiceError>,
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct ShutdownReport {
    /// What cancelled the run.
    pub cause: CancelCause,
    /// Stop outcomes in the order they were issued.
    pub stops: Vec<StopOutcome>,
}

impl ShutdownReport {
    /// Returns `true` when every issued stop succeeded.
    #[must_use]
    pub fn stopped_cleanly(&self) -> bool {
        self.stops.iter().all(|stop| stop.result.is_ok())
    }
}

struct ProxyPlan {
    service: Arc<dyn Service>,
    browser_url: Url,
}

/// Owns the lifecycle context and the collaborators of a run.
pub struct Orchestrator {
    primary: Arc<dyn Service>,
    proxy: Option<ProxyPlan>,
    browser: Box<dyn BrowserOpener>,
    views: Box<dyn ViewFactory>,
    reporter: Arc<dyn LifecycleReporter>,
    context: LifecycleContext,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Orchestrator")
            .field("primary", &self.primary.name())
            .field("proxy", &self.proxy.as_ref().map(|plan| plan.service.name()))
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator for `primary` with the system browser and the
    /// native view support this crate was built with.
    #[must_use]
    pub fn new(primary: Arc<dyn Service>, reporter: Arc<dyn LifecycleReporter>) -> Self {
        reporter.state_changed(LifecycleState::Idle);
        Self {
            primary,
            proxy: None,
            browser: Box::new(SystemBrowser),
            views: default_view_factory(),
            reporter,
            context: LifecycleContext::new(),
        }
    }

    /// Adds the console proxy and the URL the console is opened at.
    #[must_use]
    pub fn with_proxy(mut self, service: Arc<dyn Service>, browser_url: Url) -> Self {
        self.proxy = Some(ProxyPlan {
            service,
            browser_url,
        });
        self
    }

    /// Replaces the browser opener.
    #[must_use]
    pub fn with_browser(mut self, browser: Box<dyn BrowserOpener>) -> Self {
        self.browser = browser;
        self
    }

    /// Replaces the native view factory.
    #[must_use]
    pub fn with_view_factory(mut self, views: Box<dyn ViewFactory>) -> Self {
        self.views = views;
        self
    }

    /// Clone of the run's lifecycle context.
    #[must_use]
    pub fn context(&self) -> LifecycleContext {
        self.context.clone()
    }

    /// Runs until the context is cancelled, then shuts everything down.
    ///
    /// Blocks the calling thread for the whole run; a native view, when
    /// requested, runs on this thread. Runtime failures end the run but are
    /// never returned as errors: they are reported and recorded in the
    /// returned [`ShutdownReport`].
    pub fn run<S>(self, options: RunOptions, signals: S) -> ShutdownReport
    where
        S: SignalSource + 'static,
    {
        let Self {
            primary,
            proxy,
            browser,
            views,
            reporter,
            context,
        } = self;
        reporter.state_changed(LifecycleState::Starting);

        let primary = spawn_runner(primary, &context, &reporter);
        let (proxy, console_url) = match (options.proxy_required(), proxy) {
            (true, Some(plan)) => (
                spawn_runner(plan.service, &context, &reporter),
                Some(plan.browser_url),
            ),
            (true, None) => {
                warn!(
                    target: LIFECYCLE_TARGET,
                    "console proxy requested but none is configured"
                );
                (None, None)
            }
            (false, _) => (None, None),
        };

        let mode = if console_url.is_some() {
            options.console_mode()
        } else {
            ConsoleMode::Disabled
        };
        let launcher = UiLauncher::new(browser.as_ref(), views.as_ref(), reporter.as_ref());
        let console = launcher.prepare(mode, console_url.as_ref(), &context);

        let watcher = match SignalWatcher::spawn(
            signals,
            context.clone(),
            Arc::clone(&reporter),
            console.terminator(),
        ) {
            Ok(watcher) => Some(watcher),
            Err(error) => {
                context.cancel(CancelCause::Spawn {
                    role: "signal watcher".to_owned(),
                    message: error.to_string(),
                });
                None
            }
        };

        reporter.state_changed(LifecycleState::Running);
        console.run(&context, reporter.as_ref());
        let cause = context.wait();

        reporter.state_changed(LifecycleState::Cancelling);
        info!(target: LIFECYCLE_TARGET, cause = %cause, "shutting down");
        let runners = [proxy, primary].into_iter().flatten().collect::<Vec<_>>();
        let stops = runners
            .iter()
            .map(|runner| stop_runner(runner, reporter.as_ref()))
            .collect::<Vec<_>>();
        for (runner, stop) in runners.into_iter().zip(&stops) {
            // A service that refused to stop may never return from `start`.
            if stop.result.is_ok() || !runner.is_alive() {
                runner.join();
            } else {
                warn!(
                    target: LIFECYCLE_TARGET,
                    component = runner.name(),
                    "component did not stop; leaving its thread behind"
                );
                runner.detach();
            }
        }
        if let Some(watcher) = watcher {
            watcher.join();
        }
        reporter.state_changed(LifecycleState::Stopped);

        ShutdownReport { cause, stops }
    }
}

fn spawn_runner(
    service: Arc<dyn Service>,
    context: &LifecycleContext,
    reporter: &Arc<dyn LifecycleReporter>,
) -> Option<ServiceRunner> {
    let name = service.name().to_owned();
    match ServiceRunner::spawn(service, context.clone(), Arc::clone(reporter)) {
        Ok(runner) => Some(runner),
        Err(error) => {
            context.cancel(CancelCause::Spawn {
                role: name,
                message: error.to_string(),
            });
            None
        }
    }
}

fn stop_runner(runner: &ServiceRunner, reporter: &dyn LifecycleReporter) -> StopOutcome {
    let result = runner.stop();
    match &result {
        Ok(()) => reporter.stop_succeeded(runner.name()),
        Err(error) => reporter.stop_failed(runner.name(), error),
    }
    StopOutcome {
        component: runner.name().to_owned(),
        result,
    }
}
