//! Plain TCP listeners shared by the wallet service and the console proxy.

mod listener;
mod relay;

use std::net::TcpStream;

pub use listener::TcpServer;
pub use relay::RelayHandler;

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Handles a single accepted connection on its own thread.
pub trait ConnectionHandler: Send + Sync {
    /// Serves `stream` until the exchange is complete.
    fn handle(&self, stream: TcpStream);
}
