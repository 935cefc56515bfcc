//! Background supervision of a single [`Service`].
//!
//! A runner calls the service's blocking `start` on a dedicated thread and
//! translates its outcome into lifecycle terms: the clean-close result after a
//! requested stop is a normal exit, anything else cancels the run.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::lifecycle::{CancelCause, LifecycleContext};
use crate::reporter::LifecycleReporter;
use crate::service::{Service, ServiceError};

pub(crate) const RUNNER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::runner");

#[derive(Debug, Default)]
struct RunnerFlags {
    alive: AtomicBool,
    stop_requested: AtomicBool,
    stop_issued: AtomicBool,
}

/// Handle to a service running on its own thread.
pub struct ServiceRunner {
    name: String,
    service: Arc<dyn Service>,
    flags: Arc<RunnerFlags>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ServiceRunner {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ServiceRunner")
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

impl ServiceRunner {
    /// Starts `service` on a new thread.
    ///
    /// The service is marked alive before the thread is spawned so a stop
    /// issued immediately afterwards still reaches it.
    pub fn spawn(
        service: Arc<dyn Service>,
        context: LifecycleContext,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Result<Self, io::Error> {
        let name = service.name().to_owned();
        let flags = Arc::new(RunnerFlags::default());
        flags.alive.store(true, Ordering::SeqCst);

        let thread = {
            let service = Arc::clone(&service);
            let flags = Arc::clone(&flags);
            let name = name.clone();
            thread::Builder::new()
                .name(format!("runner-{}", name.replace(' ', "-")))
                .spawn(move || {
                    supervise(&name, service.as_ref(), &flags, &context, reporter.as_ref());
                })
        };
        let thread = match thread {
            Ok(thread) => thread,
            Err(error) => {
                flags.alive.store(false, Ordering::SeqCst);
                return Err(error);
            }
        };

        Ok(Self {
            name,
            service,
            flags,
            thread: Some(thread),
        })
    }

    /// Component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` while the service's `start` has not returned.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.flags.alive.load(Ordering::SeqCst)
    }

    /// Asks the service to stop.
    ///
    /// Only the first call reaches the service; later calls return `Ok(())`
    /// without side effects.
    pub fn stop(&self) -> Result<(), ServiceError> {
        if self.flags.stop_issued.swap(true, Ordering::SeqCst) {
            debug!(
                target: RUNNER_TARGET,
                component = %self.name,
                "stop already issued"
            );
            return Ok(());
        }
        self.flags.stop_requested.store(true, Ordering::SeqCst);
        self.service.stop()
    }

    /// Releases the service thread without waiting for it.
    pub fn detach(mut self) {
        if self.thread.take().is_some() {
            debug!(
                target: RUNNER_TARGET,
                component = %self.name,
                "runner thread detached"
            );
        }
    }

    /// Waits for the service thread to finish.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            debug!(
                target: RUNNER_TARGET,
                component = %self.name,
                "runner thread panicked"
            );
        }
    }
}

fn supervise(
    name: &str,
    service: &dyn Service,
    flags: &RunnerFlags,
    context: &LifecycleContext,
    reporter: &dyn LifecycleReporter,
) {
    reporter.component_starting(name);
    let outcome = service.start();
    flags.alive.store(false, Ordering::SeqCst);
    let stop_requested = flags.stop_requested.load(Ordering::SeqCst);

    match outcome {
        Ok(()) | Err(ServiceError::Closed) if stop_requested => {
            reporter.component_stopped(name);
        }
        Ok(()) | Err(ServiceError::Closed) => {
            reporter.component_exited(name);
            context.cancel(CancelCause::ComponentExited {
                component: name.to_owned(),
            });
        }
        Err(error) => {
            reporter.component_failed(name, &error);
            context.cancel(CancelCause::ComponentFailed {
                component: name.to_owned(),
                message: error.to_string(),
            });
        }
    }
}
