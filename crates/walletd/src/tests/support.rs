//! Test doubles shared by the unit and behavioural suites.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use mockall::mock;
use url::Url;

use crate::console::{
    BrowserError, BrowserOpener, ConsoleView, ViewError, ViewFactory, ViewSpec, ViewTerminator,
};
use crate::lifecycle::LifecycleState;
use crate::reporter::LifecycleReporter;
use crate::service::{Service, ServiceError};
use crate::signals::{SignalSource, TerminationSignal};

/// Upper bound for any blocking wait in tests.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// URL the fake console proxy is reachable at.
pub const PROXY_URL: &str = "http://127.0.0.1:1847/";

/// Parsed [`PROXY_URL`].
pub fn proxy_url() -> Url {
    Url::parse(PROXY_URL).expect("static proxy url")
}

/// Polls `condition` until it holds or [`WAIT_TIMEOUT`] elapses.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

mock! {
    pub Browser {}
    impl BrowserOpener for Browser {
        fn open(&self, url: &Url) -> Result<(), BrowserError>;
    }
}

/// Builds a browser mock that expects exactly one call for `expected`.
pub fn browser_expecting(
    expected: &'static str,
    result: Result<(), BrowserError>,
) -> MockBrowser {
    let mut browser = MockBrowser::new();
    browser
        .expect_open()
        .once()
        .withf(move |url| url.as_str() == expected)
        .return_once(move |_url| result);
    browser
}

/// Structured lifecycle events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReporterEvent {
    StateChanged(LifecycleState),
    ComponentStarting(String),
    ComponentStopped(String),
    ComponentExited(String),
    ComponentFailed { component: String, message: String },
    SignalReceived(TerminationSignal),
    BrowserOpenFailed,
    ViewFailed(String),
    StopSucceeded(String),
    StopFailed { component: String, message: String },
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReporterEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<ReporterEvent> {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .clone()
    }

    /// Recorded lifecycle states in order.
    pub fn states(&self) -> Vec<LifecycleState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReporterEvent::StateChanged(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    /// Components whose stop was issued, in order.
    pub fn stop_order(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReporterEvent::StopSucceeded(component)
                | ReporterEvent::StopFailed { component, .. } => Some(component),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ReporterEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingReporter {
    fn state_changed(&self, state: LifecycleState) {
        self.record(ReporterEvent::StateChanged(state));
    }

    fn component_starting(&self, component: &str) {
        self.record(ReporterEvent::ComponentStarting(component.to_owned()));
    }

    fn component_stopped(&self, component: &str) {
        self.record(ReporterEvent::ComponentStopped(component.to_owned()));
    }

    fn component_exited(&self, component: &str) {
        self.record(ReporterEvent::ComponentExited(component.to_owned()));
    }

    fn component_failed(&self, component: &str, error: &ServiceError) {
        self.record(ReporterEvent::ComponentFailed {
            component: component.to_owned(),
            message: error.to_string(),
        });
    }

    fn signal_received(&self, signal: TerminationSignal) {
        self.record(ReporterEvent::SignalReceived(signal));
    }

    fn browser_open_failed(&self, _url: &Url, _error: &BrowserError) {
        self.record(ReporterEvent::BrowserOpenFailed);
    }

    fn view_failed(&self, error: &ViewError) {
        self.record(ReporterEvent::ViewFailed(error.to_string()));
    }

    fn stop_succeeded(&self, component: &str) {
        self.record(ReporterEvent::StopSucceeded(component.to_owned()));
    }

    fn stop_failed(&self, component: &str, error: &ServiceError) {
        self.record(ReporterEvent::StopFailed {
            component: component.to_owned(),
            message: error.to_string(),
        });
    }
}

/// Ordered record of calls made across several fakes.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn push(&self, entry: String) {
        self.entries.lock().expect("journal mutex poisoned").push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().expect("journal mutex poisoned").clone()
    }
}

#[derive(Debug, Default)]
struct FakeServiceState {
    started: bool,
    closed: bool,
    stop_calls: usize,
}

/// Blocking service whose start returns once it is stopped or closed.
#[derive(Debug)]
pub struct FakeService {
    name: String,
    start_failure: Option<String>,
    stop_failure: Option<String>,
    journal: Journal,
    state: Mutex<FakeServiceState>,
    changed: Condvar,
}

impl FakeService {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            start_failure: None,
            stop_failure: None,
            journal: Journal::default(),
            state: Mutex::default(),
            changed: Condvar::new(),
        }
    }

    /// Service whose start fails immediately with `message`.
    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            start_failure: Some(message.to_owned()),
            ..Self::new(name)
        }
    }

    /// Makes `stop` report `message` and leave `start` blocked.
    pub fn with_stop_failure(mut self, message: &str) -> Self {
        self.stop_failure = Some(message.to_owned());
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn stop_calls(&self) -> usize {
        self.lock().stop_calls
    }

    pub fn is_running(&self) -> bool {
        let state = self.lock();
        state.started && !state.closed
    }

    /// Blocks until `start` has been entered.
    pub fn wait_started(&self) {
        let guard = self.lock();
        let (guard, timeout) = self
            .changed
            .wait_timeout_while(guard, WAIT_TIMEOUT, |state| !state.started)
            .expect("service mutex poisoned");
        assert!(!timeout.timed_out(), "{} never started", self.name);
        drop(guard);
    }

    /// Makes `start` return without a stop request.
    pub fn close_unprompted(&self) {
        self.lock().closed = true;
        self.changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, FakeServiceState> {
        self.state.lock().expect("service mutex poisoned")
    }
}

impl Service for FakeService {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), ServiceError> {
        self.journal.push(format!("start {}", self.name));
        if let Some(message) = &self.start_failure {
            return Err(ServiceError::failed(message.clone()));
        }
        let mut state = self.lock();
        state.started = true;
        self.changed.notify_all();
        while !state.closed {
            state = self.changed.wait(state).expect("service mutex poisoned");
        }
        Err(ServiceError::Closed)
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.journal.push(format!("stop {}", self.name));
        let mut state = self.lock();
        state.stop_calls += 1;
        if let Some(message) = &self.stop_failure {
            return Err(ServiceError::failed(message.clone()));
        }
        state.closed = true;
        drop(state);
        self.changed.notify_all();
        Ok(())
    }
}

/// Signal source the test triggers by hand.
#[derive(Debug, Clone, Default)]
pub struct FakeSignals {
    pending: Arc<Mutex<Option<TerminationSignal>>>,
}

impl FakeSignals {
    pub fn trigger(&self, signal: TerminationSignal) {
        *self.pending.lock().expect("signal mutex poisoned") = Some(signal);
    }
}

impl SignalSource for FakeSignals {
    fn try_next(&mut self) -> Option<TerminationSignal> {
        self.pending.lock().expect("signal mutex poisoned").take()
    }
}

/// Browser opener that records every URL it is asked to open.
#[derive(Debug, Clone, Default)]
pub struct RecordingBrowser {
    opened: Arc<Mutex<Vec<Url>>>,
}

impl RecordingBrowser {
    pub fn opened(&self) -> Vec<Url> {
        self.opened.lock().expect("browser mutex poisoned").clone()
    }
}

impl BrowserOpener for RecordingBrowser {
    fn open(&self, url: &Url) -> Result<(), BrowserError> {
        self.opened
            .lock()
            .expect("browser mutex poisoned")
            .push(url.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ViewState {
    running: bool,
    closed: bool,
    terminations: usize,
    drops: usize,
}

#[derive(Debug, Default)]
struct ViewShared {
    state: Mutex<ViewState>,
    changed: Condvar,
}

/// Test-side handle onto a [`FakeView`].
#[derive(Debug, Clone, Default)]
pub struct ViewHandle {
    shared: Arc<ViewShared>,
}

impl ViewHandle {
    /// Blocks until the view's run loop has been entered.
    pub fn wait_running(&self) {
        let guard = self.lock();
        let (guard, timeout) = self
            .shared
            .changed
            .wait_timeout_while(guard, WAIT_TIMEOUT, |state| !state.running)
            .expect("view mutex poisoned");
        assert!(!timeout.timed_out(), "view never started running");
        drop(guard);
    }

    /// Simulates the user closing the window.
    pub fn close(&self) {
        self.lock().closed = true;
        self.shared.changed.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn terminations(&self) -> usize {
        self.lock().terminations
    }

    pub fn drops(&self) -> usize {
        self.lock().drops
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.shared.state.lock().expect("view mutex poisoned")
    }
}

struct FakeTerminator {
    handle: ViewHandle,
}

impl ViewTerminator for FakeTerminator {
    fn terminate(&self) {
        {
            let mut state = self.handle.lock();
            state.terminations += 1;
            state.closed = true;
        }
        self.handle.shared.changed.notify_all();
    }
}

/// View whose run loop blocks until closed or terminated.
pub struct FakeView {
    handle: ViewHandle,
}

impl ConsoleView for FakeView {
    fn terminator(&self) -> Arc<dyn ViewTerminator> {
        Arc::new(FakeTerminator {
            handle: self.handle.clone(),
        })
    }

    fn run(&mut self) -> Result<(), ViewError> {
        let mut state = self.handle.lock();
        state.running = true;
        self.handle.shared.changed.notify_all();
        let deadline = Instant::now() + WAIT_TIMEOUT * 4;
        while !state.closed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            assert!(!remaining.is_zero(), "view was never closed");
            state = self
                .handle
                .shared
                .changed
                .wait_timeout(state, remaining)
                .expect("view mutex poisoned")
                .0;
        }
        state.running = false;
        Ok(())
    }
}

impl Drop for FakeView {
    fn drop(&mut self) {
        if let Ok(mut state) = self.handle.shared.state.lock() {
            state.drops += 1;
        }
    }
}

/// Factory producing [`FakeView`]s, or refusing to when unavailable.
#[derive(Debug, Clone, Default)]
pub struct FakeViewFactory {
    unavailable: bool,
    specs: Arc<Mutex<Vec<ViewSpec>>>,
    last: Arc<Mutex<Option<ViewHandle>>>,
}

impl FakeViewFactory {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> usize {
        self.specs.lock().expect("factory mutex poisoned").len()
    }

    pub fn last_spec(&self) -> Option<ViewSpec> {
        self.specs
            .lock()
            .expect("factory mutex poisoned")
            .last()
            .cloned()
    }

    pub fn last_handle(&self) -> Option<ViewHandle> {
        self.last.lock().expect("factory mutex poisoned").clone()
    }
}

impl ViewFactory for FakeViewFactory {
    fn create(&self, spec: &ViewSpec) -> Result<Box<dyn ConsoleView>, ViewError> {
        if self.unavailable {
            return Err(ViewError::Unavailable);
        }
        self.specs
            .lock()
            .expect("factory mutex poisoned")
            .push(spec.clone());
        let handle = ViewHandle::default();
        *self.last.lock().expect("factory mutex poisoned") = Some(handle.clone());
        Ok(Box::new(FakeView { handle }))
    }
}
