//! Transport layer for Chit.
//!
//! Provides the [`FrameSource`] and [`FrameSink`] traits that the connection
//! adapter drives, plus a WebSocket implementation. A live connection is
//! split into two halves so that one task can block on reads while another
//! writes:
//!
//! ```text
//!             ┌──────────────┐
//!   peer ───▶ │ FrameSource  │ ──▶ inbound loop
//!             └──────────────┘
//!             ┌──────────────┐
//!   peer ◀─── │ FrameSink    │ ◀── outbound loop
//!             └──────────────┘
//! ```
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
mod params;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use params::{ConnectParams, Rejection};
#[cfg(feature = "websocket")]
pub use websocket::{
    PendingUpgrade, WebSocketConnection, WebSocketSink, WebSocketSource,
    WebSocketTransport,
};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

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

    /// Allocates the next process-unique connection id.
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

/// Limits applied by the read half of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    /// How long the peer may stay silent before the read fails.
    /// Any frame, including a pong, restarts the window.
    pub idle_timeout: Duration,
    /// Largest accepted inbound message, in bytes.
    pub max_message_size: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60),
            max_message_size: 512,
        }
    }
}

/// The read half of a connection.
///
/// Methods return `impl Future + Send` (rather than `async fn`) so that
/// generic callers can move the half into a spawned Tokio task.
pub trait FrameSource: Send + 'static {
    /// Receives the next data message from the peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed. Control
    /// frames (ping/pong) are consumed internally.
    fn recv(
        &mut self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;
}

/// The write half of a connection.
pub trait FrameSink: Send + 'static {
    /// Sends one data message to the peer.
    fn send(
        &mut self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Sends a liveness probe. The peer's pong refreshes our read window.
    fn ping(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Sends a close frame.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
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
    fn test_read_limits_default() {
        let limits = ReadLimits::default();
        assert_eq!(limits.idle_timeout, Duration::from_secs(60));
        assert_eq!(limits.max_message_size, 512);
    }
}
