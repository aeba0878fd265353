//! Error types for the hub.

/// Errors returned by [`HubHandle`](crate::HubHandle) methods.
///
/// Delivery problems for individual connections are never errors; they are
/// handled inside the loop by dropping the connection.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The hub loop has shut down (or its command channel is closed).
    #[error("connection hub is unavailable")]
    Unavailable,
}
