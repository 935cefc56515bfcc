use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use walletd_config::BindAddress;

use super::{ConnectionHandler, TRANSPORT_TARGET};
use crate::service::{Service, ServiceError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// TCP server whose blocking `start` runs a non-blocking accept loop.
///
/// The socket is bound when `start` is called, so bind failures surface as a
/// service failure. Each accepted connection is served on its own thread;
/// `stop` closes the listener but leaves in-flight connections to finish.
pub struct TcpServer {
    name: String,
    address: BindAddress,
    handler: Arc<dyn ConnectionHandler>,
    shutdown: AtomicBool,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl fmt::Debug for TcpServer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TcpServer")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

impl TcpServer {
    /// Creates a server that will listen on `address` once started.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        address: BindAddress,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            address,
            handler,
            shutdown: AtomicBool::new(false),
            local_addr: Mutex::new(None),
        }
    }

    /// Configured listen address.
    #[must_use]
    pub fn address(&self) -> &BindAddress {
        &self.address
    }

    /// Address actually bound, once the server is listening.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bind(&self) -> Result<TcpListener, ServiceError> {
        let mut addrs = (self.address.host.as_str(), self.address.port)
            .to_socket_addrs()
            .map_err(|source| ServiceError::Resolve {
                address: self.address.clone(),
                source,
            })?;
        let addr = addrs.next().ok_or_else(|| ServiceError::NoAddress {
            address: self.address.clone(),
        })?;
        let listener = TcpListener::bind(addr).map_err(|source| ServiceError::Bind {
            address: self.address.clone(),
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| ServiceError::Listener {
                address: self.address.clone(),
                source,
            })?;
        Ok(listener)
    }

    fn accept_loop(&self, listener: &TcpListener) {
        let mut last_error = None::<io::ErrorKind>;
        while !self.shutdown.load(Ordering::SeqCst) {
            match accept_connection(listener) {
                Ok(Some(stream)) => {
                    last_error = None;
                    self.dispatch(stream);
                }
                Ok(None) => thread::sleep(ACCEPT_BACKOFF),
                Err(error) => {
                    let kind = error.kind();
                    if last_error != Some(kind) {
                        warn!(
                            target: TRANSPORT_TARGET,
                            component = %self.name,
                            error = %error,
                            "accept error"
                        );
                    }
                    last_error = Some(kind);
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
    }

    fn dispatch(&self, stream: TcpStream) {
        let handler = Arc::clone(&self.handler);
        let spawned = thread::Builder::new()
            .name(format!("{}-conn", self.name.replace(' ', "-")))
            .spawn(move || handler.handle(stream));
        if let Err(error) = spawned {
            warn!(
                target: TRANSPORT_TARGET,
                component = %self.name,
                error = %error,
                "failed to spawn connection thread"
            );
        }
    }
}

impl Service for TcpServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), ServiceError> {
        let listener = self.bind()?;
        let local = listener.local_addr().ok();
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = local;
        info!(
            target: TRANSPORT_TARGET,
            component = %self.name,
            address = %self.address,
            "listening"
        );
        self.accept_loop(&listener);
        drop(listener);
        debug!(target: TRANSPORT_TARGET, component = %self.name, "listener closed");
        Err(ServiceError::Closed)
    }

    fn stop(&self) -> Result<(), ServiceError> {
        self.shutdown.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn accept_connection(listener: &TcpListener) -> Result<Option<TcpStream>, io::Error> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}
