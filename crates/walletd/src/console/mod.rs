//! Console presentation: default browser or an embedded native view.
//!
//! Everything here runs on the calling thread. A native view is created,
//! run and dropped there; the only handle that crosses threads is its
//! [`ViewTerminator`].

mod browser;
#[cfg(feature = "webview")]
mod webview;

use std::fmt;
use std::sync::Arc;
use std::thread;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::lifecycle::{CancelCause, LifecycleContext};
use crate::options::ConsoleMode;
use crate::reporter::LifecycleReporter;

pub use browser::{BrowserError, BrowserOpener, SystemBrowser};
#[cfg(feature = "webview")]
pub use webview::WebviewFactory;

pub(crate) const CONSOLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::console");

/// Title of the native console window.
pub const VIEW_TITLE: &str = "Wallet Console";
/// Initial width of the native console window in logical pixels.
pub const VIEW_WIDTH: u32 = 800;
/// Initial height of the native console window in logical pixels.
pub const VIEW_HEIGHT: u32 = 600;

/// How the window size constrains user resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeHint {
    /// Freely resizable.
    #[default]
    None,
    /// The size is a lower bound.
    Min,
    /// The size is an upper bound.
    Max,
    /// The window cannot be resized.
    Fixed,
}

/// Parameters for constructing a console view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSpec {
    /// Window title.
    pub title: String,
    /// Width in logical pixels.
    pub width: u32,
    /// Height in logical pixels.
    pub height: u32,
    /// Resizing behaviour.
    pub hint: SizeHint,
    /// Page to navigate to.
    pub url: Url,
}

impl ViewSpec {
    /// Standard console window pointed at `url`.
    #[must_use]
    pub fn console(url: Url) -> Self {
        Self {
            title: VIEW_TITLE.to_owned(),
            width: VIEW_WIDTH,
            height: VIEW_HEIGHT,
            hint: SizeHint::None,
            url,
        }
    }
}

/// Errors raised by native console views.
#[derive(Debug, Error)]
pub enum ViewError {
    /// This build has no native view support.
    #[error("native console view is not available in this build")]
    Unavailable,
    /// The window or its web view could not be built.
    #[error("failed to create console view: {message}")]
    Create {
        /// Rendered platform error.
        message: String,
    },
    /// The view's run loop ended abnormally.
    #[error("console view run loop failed: {message}")]
    Run {
        /// Rendered platform error.
        message: String,
    },
}

/// Thread-safe request to end a view's run loop.
///
/// Calls after the first, or after the view has closed, have no effect.
pub trait ViewTerminator: Send + Sync {
    /// Asks the view to close.
    fn terminate(&self);
}

/// Native view owned by the calling thread.
pub trait ConsoleView {
    /// Handle other threads may use to close the view.
    fn terminator(&self) -> Arc<dyn ViewTerminator>;

    /// Enters the view's run loop and blocks until it closes.
    fn run(&mut self) -> Result<(), ViewError>;
}

/// Creates console views.
pub trait ViewFactory {
    /// Builds a view from `spec` without running it.
    fn create(&self, spec: &ViewSpec) -> Result<Box<dyn ConsoleView>, ViewError>;
}

/// Factory used when the crate is built without native view support.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoViewFactory;

impl ViewFactory for NoViewFactory {
    fn create(&self, _spec: &ViewSpec) -> Result<Box<dyn ConsoleView>, ViewError> {
        Err(ViewError::Unavailable)
    }
}

/// Factory matching the features this crate was built with.
#[must_use]
pub fn default_view_factory() -> Box<dyn ViewFactory> {
    #[cfg(feature = "webview")]
    {
        Box::new(WebviewFactory::new())
    }
    #[cfg(not(feature = "webview"))]
    {
        Box::new(NoViewFactory)
    }
}

/// Opens the console the way the run options ask for.
pub struct UiLauncher<'a> {
    browser: &'a dyn BrowserOpener,
    views: &'a dyn ViewFactory,
    reporter: &'a dyn LifecycleReporter,
}

impl fmt::Debug for UiLauncher<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("UiLauncher").finish_non_exhaustive()
    }
}

impl<'a> UiLauncher<'a> {
    /// Builds a launcher from its collaborators.
    #[must_use]
    pub fn new(
        browser: &'a dyn BrowserOpener,
        views: &'a dyn ViewFactory,
        reporter: &'a dyn LifecycleReporter,
    ) -> Self {
        Self {
            browser,
            views,
            reporter,
        }
    }

    /// Opens the browser or builds the native view for `mode`.
    ///
    /// Browser failures are reported and otherwise ignored. A view that cannot
    /// be created is reported and cancels `context`. Nothing is opened once
    /// the run has already been cancelled.
    pub fn prepare(
        &self,
        mode: ConsoleMode,
        url: Option<&Url>,
        context: &LifecycleContext,
    ) -> PreparedConsole {
        let Some(url) = url else {
            return PreparedConsole::Idle;
        };
        if mode == ConsoleMode::Disabled {
            return PreparedConsole::Idle;
        }
        if context.is_cancelled() {
            debug!(
                target: CONSOLE_TARGET,
                "run already cancelled; not opening the console"
            );
            return PreparedConsole::Idle;
        }
        match mode {
            ConsoleMode::Disabled => PreparedConsole::Idle,
            ConsoleMode::Browser => {
                info!(target: CONSOLE_TARGET, url = %url, "opening console in browser");
                if let Err(error) = self.browser.open(url) {
                    self.reporter.browser_open_failed(url, &error);
                }
                PreparedConsole::Idle
            }
            ConsoleMode::NativeView => match self.views.create(&ViewSpec::console(url.clone())) {
                Ok(view) => PreparedConsole::View(view),
                Err(error) => {
                    self.reporter.view_failed(&error);
                    context.cancel(CancelCause::ViewFailed {
                        message: error.to_string(),
                    });
                    PreparedConsole::Idle
                }
            },
        }
    }
}

/// Outcome of [`UiLauncher::prepare`].
pub enum PreparedConsole {
    /// Nothing occupies the calling thread.
    Idle,
    /// A native view waiting to be run.
    View(Box<dyn ConsoleView>),
}

impl fmt::Debug for PreparedConsole {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => formatter.write_str("Idle"),
            Self::View(_) => formatter.write_str("View(..)"),
        }
    }
}

impl PreparedConsole {
    /// Terminator of the prepared view, if there is one.
    #[must_use]
    pub fn terminator(&self) -> Option<Arc<dyn ViewTerminator>> {
        match self {
            Self::Idle => None,
            Self::View(view) => Some(view.terminator()),
        }
    }

    /// Runs the view on the calling thread until it closes.
    ///
    /// While the view runs, a sentinel thread closes it if the run is
    /// cancelled for any other reason. The view is dropped as soon as its run
    /// loop returns and its closing always cancels `context`.
    pub fn run(self, context: &LifecycleContext, reporter: &dyn LifecycleReporter) {
        let Self::View(mut view) = self else {
            return;
        };
        let terminator = view.terminator();
        let sentinel = {
            let context = context.clone();
            let terminator = Arc::clone(&terminator);
            thread::Builder::new()
                .name("view-sentinel".to_owned())
                .spawn(move || {
                    context.wait();
                    terminator.terminate();
                })
        };
        let sentinel = match sentinel {
            Ok(sentinel) => sentinel,
            Err(error) => {
                context.cancel(CancelCause::Spawn {
                    role: "view sentinel".to_owned(),
                    message: error.to_string(),
                });
                return;
            }
        };

        if context.is_cancelled() {
            debug!(target: CONSOLE_TARGET, "run cancelled before the view opened");
            drop(view);
        } else {
            info!(target: CONSOLE_TARGET, "console view running");
            let outcome = view.run();
            drop(view);
            match outcome {
                Ok(()) => {
                    info!(target: CONSOLE_TARGET, "console view closed");
                    context.cancel(CancelCause::ViewClosed);
                }
                Err(error) => {
                    reporter.view_failed(&error);
                    context.cancel(CancelCause::ViewFailed {
                        message: error.to_string(),
                    });
                }
            }
        }

        if sentinel.join().is_err() {
            debug!(target: CONSOLE_TARGET, "view sentinel panicked");
        }
    }
}
