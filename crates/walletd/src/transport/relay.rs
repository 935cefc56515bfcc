use std::io;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};
use walletd_config::BindAddress;

use super::{ConnectionHandler, TRANSPORT_TARGET};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Relays each accepted connection byte-for-byte to a fixed upstream.
#[derive(Debug, Clone)]
pub struct RelayHandler {
    upstream: BindAddress,
}

impl RelayHandler {
    /// Creates a relay towards `upstream`.
    #[must_use]
    pub fn new(upstream: BindAddress) -> Self {
        Self { upstream }
    }

    /// Upstream address.
    #[must_use]
    pub fn upstream(&self) -> &BindAddress {
        &self.upstream
    }

    fn connect(&self) -> io::Result<TcpStream> {
        let mut last_error = None;
        for addr in (self.upstream.host.as_str(), self.upstream.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => return Ok(stream),
                Err(error) => last_error = Some(error),
            }
        }
        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "upstream did not resolve")
        }))
    }
}

impl ConnectionHandler for RelayHandler {
    fn handle(&self, client: TcpStream) {
        let upstream = match self.connect() {
            Ok(upstream) => upstream,
            Err(error) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    upstream = %self.upstream,
                    error = %error,
                    "failed to reach console upstream"
                );
                return;
            }
        };
        if let Err(error) = relay(client, upstream) {
            debug!(
                target: TRANSPORT_TARGET,
                upstream = %self.upstream,
                error = %error,
                "relay ended with error"
            );
        }
    }
}

fn relay(client: TcpStream, upstream: TcpStream) -> io::Result<()> {
    let mut client_reader = client.try_clone()?;
    let mut upstream_writer = upstream.try_clone()?;
    let outbound = thread::Builder::new()
        .name("console-relay".to_owned())
        .spawn(move || {
            let copied = io::copy(&mut client_reader, &mut upstream_writer);
            half_close(&upstream_writer);
            copied
        })
        .inspect_err(|error| {
            warn!(
                target: TRANSPORT_TARGET,
                error = %error,
                "failed to spawn relay thread"
            );
        })?;

    let mut upstream_reader = upstream;
    let mut client_writer = client;
    let inbound = io::copy(&mut upstream_reader, &mut client_writer);
    half_close(&client_writer);

    let outbound = outbound
        .join()
        .map_err(|_| io::Error::other("relay thread panicked"))?;
    inbound?;
    outbound?;
    Ok(())
}

// The peer may already have gone away; that ends the relay either way.
fn half_close(stream: &TcpStream) {
    if let Err(error) = stream.shutdown(Shutdown::Write) {
        debug!(target: TRANSPORT_TARGET, error = %error, "half-close failed");
    }
}
