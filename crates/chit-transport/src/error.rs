use std::time::Duration;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The upgrade request was refused before the stream was established.
    #[error("upgrade rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    /// A write did not complete within its deadline.
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// The peer sent nothing (not even a pong) within the idle window.
    #[error("peer idle for {0:?}")]
    IdleTimeout(Duration),

    /// An inbound message exceeded the configured read limit.
    #[error("message of {size} bytes exceeds limit of {limit}")]
    MessageTooLarge { size: usize, limit: usize },
}
