//! Transport abstraction layer for Termgate.
//!
//! Provides the [`Transport`], [`Incoming`] and [`Connection`] traits that
//! abstract over the byte streams clients attach with. Every transport is
//! line-oriented: one `recv` yields one client frame (one line of input).
//!
//! Accepting is split in two steps. [`Transport::accept`] hands back an
//! [`Incoming`] that only knows the peer address, so the listener can turn
//! a locked-out origin away before any handshake or banner. The listener
//! then calls [`Incoming::establish`] inside the connection's own task.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use tcp::{TcpIncoming, TcpLineConnection, TcpLineTransport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketIncoming, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default upper bound on a single client frame, in bytes.
pub const DEFAULT_MAX_FRAME_LEN: usize = 4096;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The not-yet-established connection produced by `accept`.
    type Incoming: Incoming<Connection = Self::Connection>;
    /// The connection type produced once the incoming side is established.
    type Connection: Connection;

    /// Waits for the next peer to connect.
    ///
    /// This must stay cheap: no handshake and no reads from the peer, so a
    /// slow client can never stall the accept loop.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Incoming, TransportError>> + Send;

    /// Returns the local address the transport is bound to.
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;
}

/// A peer that has connected but has not been handed a session yet.
pub trait Incoming: Send + 'static {
    /// The connection type this becomes.
    type Connection: Connection;

    /// The network address of the peer.
    fn peer_addr(&self) -> SocketAddr;

    /// Completes any transport handshake and returns a usable connection.
    fn establish(
        self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// Sends a raw notice and drops the peer without establishing a session.
    ///
    /// An empty notice closes the socket silently.
    fn refuse(self, notice: &[u8]) -> impl Future<Output = ()> + Send;
}

/// A single connection that exchanges line frames with a peer.
pub trait Connection: Send + Sync + 'static {
    /// Sends one encoded server frame to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next client frame (one line, delimiter stripped).
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed. An empty
    /// line is returned as `Ok(Some(vec![]))`, never swallowed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the peer's network address.
    fn peer_addr(&self) -> SocketAddr;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_next_is_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }

    #[test]
    fn test_frame_too_long_is_recoverable() {
        assert!(TransportError::FrameTooLong { max: 10 }.is_recoverable());
        assert!(
            !TransportError::ConnectionClosed("gone".into()).is_recoverable()
        );
    }
}
