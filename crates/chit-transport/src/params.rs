//! Connection parameters carried by the upgrade request.
//!
//! Clients connect to `/ws/{sessionCode}?playerId={participantId}`. Both
//! values are required; a request missing either is refused with a 400
//! before any WebSocket handshake response is written.

use std::fmt;

use url::form_urlencoded;

/// Path prefix for the connection endpoint.
const WS_PREFIX: &str = "/ws/";

/// Query parameter naming the participant.
const PARTICIPANT_PARAM: &str = "playerId";

/// The session and participant a connection is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub session_code: String,
    pub participant_id: String,
}

impl ConnectParams {
    /// Extracts the parameters from a request path and query string.
    ///
    /// The query is percent-decoded, so `playerId=p%2D1` binds `p-1`.
    pub fn parse(path: &str, query: Option<&str>) -> Result<Self, Rejection> {
        let session_code = path
            .strip_prefix(WS_PREFIX)
            .map(|rest| rest.trim_end_matches('/'))
            .filter(|code| !code.is_empty() && !code.contains('/'))
            .ok_or_else(|| Rejection::bad_request("session code is required"))?;

        let participant_id = form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .find(|(key, _)| *key == PARTICIPANT_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                Rejection::bad_request("playerId query parameter is required")
            })?;

        Ok(Self {
            session_code: session_code.to_string(),
            participant_id,
        })
    }
}

/// Why an upgrade request was refused, as an HTTP status and reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: u16,
    pub reason: String,
}

impl Rejection {
    /// A 400 rejection.
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self {
            status: 400,
            reason: reason.into(),
        }
    }

    /// A 404 rejection.
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self {
            status: 404,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.reason)
    }
}
