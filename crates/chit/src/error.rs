//! Unified error type for Chit.

use std::fmt;

use chit_hub::HubError;
use chit_protocol::{ProtocolError, SessionCode};
use chit_round::RoundError;
use chit_session::SessionError;
use chit_transport::TransportError;

/// Top-level error wrapping every crate-specific error.
///
/// `#[from]` on each wrapped variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum ChitError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry or session-status error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The round engine refused the guess.
    #[error(transparent)]
    Round(#[from] RoundError),

    /// The hub loop is gone.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// A required field was missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The session's single guess has already been scored.
    #[error("round in session {0} has already concluded")]
    RoundAlreadyConcluded(SessionCode),
}

/// Coarse classification of a [`ChitError`], for mapping onto response
/// codes at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// Unknown session code.
    NotFound,
    /// The session already has four participants.
    Capacity,
    /// The session is not in a state that allows the operation.
    State,
    /// A connection or the hub failed.
    Transport,
}

impl ErrorKind {
    /// The HTTP status a request layer would answer with.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Validation | Self::Capacity | Self::State => 400,
            Self::NotFound => 404,
            Self::Transport => 503,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not found"),
            Self::Capacity => write!(f, "capacity"),
            Self::State => write!(f, "state"),
            Self::Transport => write!(f, "transport"),
        }
    }
}

impl ChitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Hub(_) => ErrorKind::Transport,
            Self::Protocol(_) | Self::Validation(_) => ErrorKind::Validation,
            Self::Session(e) => match e {
                SessionError::NotFound(_) => ErrorKind::NotFound,
                SessionError::Full(_) => ErrorKind::Capacity,
                SessionError::AlreadyExists(_) | SessionError::InvalidStatus { .. } => {
                    ErrorKind::State
                }
            },
            Self::Round(_) | Self::RoundAlreadyConcluded(_) => ErrorKind::State,
        }
    }
}

#[cfg(test)]
mod tests {
    use chit_protocol::SessionStatus;

    use super::*;

    fn code() -> SessionCode {
        SessionCode::new("AB12")
    }

    #[test]
    fn test_from_transport_error() {
        let err: ChitError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, ChitError::Transport(_)));
        assert!(err.to_string().contains("gone"));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_from_protocol_error_is_validation() {
        let err: ChitError = ProtocolError::InvalidMessage("bad".into()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_session_errors_map_to_kinds() {
        let cases = [
            (SessionError::NotFound(code()), ErrorKind::NotFound),
            (SessionError::Full(code()), ErrorKind::Capacity),
            (SessionError::AlreadyExists(code()), ErrorKind::State),
            (
                SessionError::InvalidStatus {
                    code: code(),
                    status: SessionStatus::Concluded,
                },
                ErrorKind::State,
            ),
        ];
        for (source, kind) in cases {
            assert_eq!(ChitError::from(source).kind(), kind);
        }
    }

    #[test]
    fn test_round_error_keeps_fixed_message() {
        let err: ChitError = RoundError::UnauthorizedActor.into();
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(err.to_string(), "only the Mantri can make a guess");
    }

    #[test]
    fn test_hub_error_is_transport() {
        let err: ChitError = HubError::Unavailable.into();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.kind().http_status(), 503);
    }

    #[test]
    fn test_error_kind_http_status() {
        assert_eq!(ErrorKind::Validation.http_status(), 400);
        assert_eq!(ErrorKind::NotFound.http_status(), 404);
        assert_eq!(ErrorKind::Capacity.http_status(), 400);
    }
}
