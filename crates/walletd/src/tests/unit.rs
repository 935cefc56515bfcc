//! Orchestrator unit tests driven by in-memory services.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use rstest::{fixture, rstest};

use crate::lifecycle::{CancelCause, LifecycleState};
use crate::options::RunOptions;
use crate::orchestrator::{Orchestrator, ShutdownReport};
use crate::services::{CONSOLE_PROXY_NAME, WALLET_SERVICE_NAME};
use crate::signals::TerminationSignal;
use crate::tests::support::{
    FakeService, FakeSignals, FakeViewFactory, Journal, RecordingBrowser, RecordingReporter,
    ReporterEvent, ViewHandle, WAIT_TIMEOUT, eventually, proxy_url,
};

struct Harness {
    journal: Journal,
    primary: Arc<FakeService>,
    proxy: Arc<FakeService>,
    reporter: Arc<RecordingReporter>,
    browser: RecordingBrowser,
    views: FakeViewFactory,
    signals: FakeSignals,
}

impl Harness {
    fn with_services(journal: Journal, primary: FakeService, proxy: FakeService) -> Self {
        Self {
            primary: Arc::new(primary.with_journal(journal.clone())),
            proxy: Arc::new(proxy.with_journal(journal.clone())),
            journal,
            reporter: Arc::new(RecordingReporter::default()),
            browser: RecordingBrowser::default(),
            views: FakeViewFactory::default(),
            signals: FakeSignals::default(),
        }
    }

    fn run(&self, options: RunOptions) -> ShutdownReport {
        Orchestrator::new(self.primary.clone(), self.reporter.clone())
            .with_proxy(self.proxy.clone(), proxy_url())
            .with_browser(Box::new(self.browser.clone()))
            .with_view_factory(Box::new(self.views.clone()))
            .run(options, self.signals.clone())
    }

    fn interrupt_once_started(&self) -> thread::JoinHandle<()> {
        let primary = Arc::clone(&self.primary);
        let signals = self.signals.clone();
        thread::spawn(move || {
            primary.wait_started();
            signals.trigger(TerminationSignal::Interrupt);
        })
    }

    fn view_handle(&self) -> ViewHandle {
        assert!(
            eventually(|| self.views.last_handle().is_some()),
            "no view was created"
        );
        self.views.last_handle().expect("view handle")
    }

    fn started(&self, component: &str) -> bool {
        self.journal
            .entries()
            .contains(&format!("start {component}"))
    }

    fn stops(&self) -> Vec<String> {
        self.journal
            .entries()
            .into_iter()
            .filter(|entry| entry.starts_with("stop "))
            .collect()
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::with_services(
        Journal::default(),
        FakeService::new(WALLET_SERVICE_NAME),
        FakeService::new(CONSOLE_PROXY_NAME),
    )
}

#[rstest]
fn no_flags_start_only_the_wallet_service(harness: Harness) {
    let trigger = harness.interrupt_once_started();
    let report = harness.run(RunOptions::from_flags(false, false));
    trigger.join().expect("trigger panicked");

    assert_eq!(report.cause, CancelCause::Signal(TerminationSignal::Interrupt));
    assert!(!harness.started(CONSOLE_PROXY_NAME));
    assert_eq!(harness.primary.stop_calls(), 1);
    assert_eq!(harness.proxy.stop_calls(), 0);
    assert!(harness.browser.opened().is_empty());
    assert_eq!(harness.views.created(), 0);
    assert!(report.stopped_cleanly());
}

#[rstest]
fn proxy_flag_opens_the_browser_once(harness: Harness) {
    let trigger = harness.interrupt_once_started();
    let report = harness.run(RunOptions::from_flags(true, false));
    trigger.join().expect("trigger panicked");

    assert!(harness.started(CONSOLE_PROXY_NAME));
    assert_eq!(harness.browser.opened(), vec![proxy_url()]);
    assert_eq!(harness.views.created(), 0);
    assert_eq!(
        harness.stops(),
        vec![
            format!("stop {CONSOLE_PROXY_NAME}"),
            format!("stop {WALLET_SERVICE_NAME}"),
        ]
    );
    assert_eq!(
        report
            .stops
            .iter()
            .map(|stop| stop.component.as_str())
            .collect::<Vec<_>>(),
        vec![CONSOLE_PROXY_NAME, WALLET_SERVICE_NAME]
    );
}

#[rstest]
#[case(false)]
#[case(true)]
fn native_view_blocks_while_services_run(harness: Harness, #[case] console_proxy: bool) {
    let report = thread::scope(|scope| {
        let closer = scope.spawn(|| {
            let view = harness.view_handle();
            view.wait_running();
            harness.primary.wait_started();
            harness.proxy.wait_started();
            let services_running = harness.primary.is_running() && harness.proxy.is_running();
            view.close();
            services_running
        });
        let report = harness.run(RunOptions::from_flags(console_proxy, true));
        assert!(
            closer.join().expect("closer panicked"),
            "services should run while the view is open"
        );
        report
    });

    assert_eq!(report.cause, CancelCause::ViewClosed);
    assert!(harness.browser.opened().is_empty());
    assert_eq!(harness.views.created(), 1);
    let view = harness.view_handle();
    assert!(!view.is_running());
    assert_eq!(view.drops(), 1);
    assert_eq!(harness.primary.stop_calls(), 1);
    assert_eq!(harness.proxy.stop_calls(), 1);
}

#[rstest]
fn wallet_failure_stops_proxy_before_wallet() {
    let harness = Harness::with_services(
        Journal::default(),
        FakeService::failing(WALLET_SERVICE_NAME, "address in use"),
        FakeService::new(CONSOLE_PROXY_NAME),
    );
    let report = harness.run(RunOptions::from_flags(true, false));

    assert_eq!(
        report.cause,
        CancelCause::ComponentFailed {
            component: WALLET_SERVICE_NAME.to_owned(),
            message: "address in use".to_owned(),
        }
    );
    assert_eq!(
        harness.stops(),
        vec![
            format!("stop {CONSOLE_PROXY_NAME}"),
            format!("stop {WALLET_SERVICE_NAME}"),
        ]
    );
    assert!(harness.reporter.events().contains(&ReporterEvent::ComponentFailed {
        component: WALLET_SERVICE_NAME.to_owned(),
        message: "address in use".to_owned(),
    }));
}

#[rstest]
fn failing_stop_does_not_prevent_the_next_one() {
    let harness = Harness::with_services(
        Journal::default(),
        FakeService::new(WALLET_SERVICE_NAME),
        FakeService::new(CONSOLE_PROXY_NAME).with_stop_failure("socket busy"),
    );
    let trigger = harness.interrupt_once_started();
    let report = harness.run(RunOptions::from_flags(true, false));
    trigger.join().expect("trigger panicked");

    assert!(!report.stopped_cleanly());
    assert_eq!(
        harness.reporter.stop_order(),
        vec![CONSOLE_PROXY_NAME.to_owned(), WALLET_SERVICE_NAME.to_owned()]
    );
    let events = harness.reporter.events();
    assert!(events.contains(&ReporterEvent::StopFailed {
        component: CONSOLE_PROXY_NAME.to_owned(),
        message: "socket busy".to_owned(),
    }));
    assert!(events.contains(&ReporterEvent::StopSucceeded(WALLET_SERVICE_NAME.to_owned())));
    harness.proxy.wait_started();
    assert!(harness.proxy.is_running());
    harness.proxy.close_unprompted();
}

#[rstest]
fn run_returns_when_a_service_refuses_to_stop() {
    let harness = Arc::new(Harness::with_services(
        Journal::default(),
        FakeService::new(WALLET_SERVICE_NAME).with_stop_failure("shutdown refused"),
        FakeService::new(CONSOLE_PROXY_NAME),
    ));
    let (finished, report) = mpsc::channel();
    let trigger = harness.interrupt_once_started();
    let runner = {
        let harness = Arc::clone(&harness);
        thread::spawn(move || {
            let outcome = harness.run(RunOptions::default());
            finished.send(outcome).expect("report receiver dropped");
        })
    };

    let report = report
        .recv_timeout(WAIT_TIMEOUT)
        .expect("run should return although the wallet service keeps running");
    trigger.join().expect("trigger panicked");
    runner.join().expect("run thread panicked");

    assert_eq!(report.cause, CancelCause::Signal(TerminationSignal::Interrupt));
    assert!(!report.stopped_cleanly());
    assert!(harness.primary.is_running());
    assert_eq!(
        harness.reporter.states().last(),
        Some(&LifecycleState::Stopped)
    );
    harness.primary.close_unprompted();
}

#[rstest]
fn states_follow_the_lifecycle(harness: Harness) {
    let trigger = harness.interrupt_once_started();
    harness.run(RunOptions::default());
    trigger.join().expect("trigger panicked");

    assert_eq!(
        harness.reporter.states(),
        vec![
            LifecycleState::Idle,
            LifecycleState::Starting,
            LifecycleState::Running,
            LifecycleState::Cancelling,
            LifecycleState::Stopped,
        ]
    );
}

#[rstest]
fn signal_terminates_an_open_view(harness: Harness) {
    let report = thread::scope(|scope| {
        scope.spawn(|| {
            harness.view_handle().wait_running();
            harness.signals.trigger(TerminationSignal::Terminate);
        });
        harness.run(RunOptions::from_flags(false, true))
    });

    assert_eq!(report.cause, CancelCause::Signal(TerminationSignal::Terminate));
    assert!(harness.view_handle().terminations() >= 1);
    assert_eq!(harness.view_handle().drops(), 1);
}
