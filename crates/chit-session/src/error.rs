//! Error types for the session layer.

use chit_protocol::{SessionCode, SessionStatus};

/// Errors raised by the registry and by status checks on a session.
///
/// [`Session::add_participant`](crate::Session::add_participant) itself
/// never errors: it refuses by returning `false`, and callers that need a
/// reason map that onto [`SessionError::Full`] after checking the count.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the given code.
    #[error("session {0} not found")]
    NotFound(SessionCode),

    /// A session with this code is already registered. The existing session
    /// is left untouched.
    #[error("session {0} already exists")]
    AlreadyExists(SessionCode),

    /// The session already has four participants.
    #[error("session {0} is full")]
    Full(SessionCode),

    /// The operation is not allowed in the session's current status.
    #[error("session {code} is {status}")]
    InvalidStatus {
        code: SessionCode,
        status: SessionStatus,
    },
}
