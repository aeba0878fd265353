//! Event envelopes pushed over each connection.
//!
//! Everything on the wire is one flat object:
//!
//! ```text
//! { "type": "GAME_START", "payload": { "message": "..." } }
//! ```
//!
//! Server-originated events form the closed [`Event`] enum, one variant per
//! type tag, so every producer is checked at compile time. Client-originated
//! traffic is not interpreted: it arrives as an [`InboundMessage`] and goes
//! back out, stamped, as a [`RelayFrame`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ParticipantId, ProtocolError, Role, SessionCode};

/// Greeting sent to a freshly registered connection.
const CONNECTED_MESSAGE: &str = "Connected to session";

/// Notice broadcast when roles are dealt.
const GAME_START_MESSAGE: &str = "All players ready! Roles have been assigned.";

/// Notice broadcast with the final scores.
const GAME_END_MESSAGE: &str = "Game finished!";

/// A server-originated event.
///
/// `tag = "type", content = "payload"` gives the adjacently tagged
/// `{type, payload}` shape; `rename_all_fields` turns every payload field
/// into camelCase for browser clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum Event {
    /// Sent once, privately, to a newly registered connection.
    #[serde(rename = "connected")]
    Connected {
        message: String,
        participant_id: ParticipantId,
        session_code: SessionCode,
    },

    /// A connection opened in the session.
    #[serde(rename = "player_joined")]
    ConnectionOpened {
        participant_id: ParticipantId,
        player_count: usize,
    },

    /// A connection closed. `player_count` is the post-departure count.
    #[serde(rename = "player_left")]
    ConnectionClosed {
        participant_id: ParticipantId,
        player_count: usize,
    },

    /// A participant joined through the lobby.
    #[serde(rename = "PLAYER_JOINED")]
    PlayerJoined {
        name: String,
        player_id: ParticipantId,
    },

    /// Roles have been dealt.
    #[serde(rename = "GAME_START")]
    GameStart { message: String },

    /// Private: the receiving participant's role.
    #[serde(rename = "YOUR_ROLE")]
    YourRole { role: Role, name: String },

    /// Outcome of the accuser's guess, scores keyed by participant id.
    #[serde(rename = "GUESS_RESULT")]
    GuessResult {
        #[serde(rename = "mantri")]
        accuser_name: String,
        correct: bool,
        scores: BTreeMap<ParticipantId, u32>,
    },

    /// Final scores keyed by display name.
    #[serde(rename = "GAME_END")]
    GameEnd {
        message: String,
        scores: BTreeMap<String, u32>,
    },
}

impl Event {
    pub fn connected(participant_id: ParticipantId, session_code: SessionCode) -> Self {
        Self::Connected {
            message: CONNECTED_MESSAGE.to_string(),
            participant_id,
            session_code,
        }
    }

    pub fn game_start() -> Self {
        Self::GameStart {
            message: GAME_START_MESSAGE.to_string(),
        }
    }

    pub fn game_end(scores: BTreeMap<String, u32>) -> Self {
        Self::GameEnd {
            message: GAME_END_MESSAGE.to_string(),
            scores,
        }
    }

    /// The wire type tag, for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::ConnectionOpened { .. } => "player_joined",
            Self::ConnectionClosed { .. } => "player_left",
            Self::PlayerJoined { .. } => "PLAYER_JOINED",
            Self::GameStart { .. } => "GAME_START",
            Self::YourRole { .. } => "YOUR_ROLE",
            Self::GuessResult { .. } => "GUESS_RESULT",
            Self::GameEnd { .. } => "GAME_END",
        }
    }
}

/// A message as sent by a client. Only `type` is required.
///
/// Any identifiers the client puts in the object are ignored (unknown
/// fields are dropped), so they can never leak into the relay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    /// `data` is accepted as an alias for older clients.
    #[serde(default, alias = "data")]
    pub payload: Map<String, Value>,
}

impl InboundMessage {
    /// Rejects a message whose `type` tag is blank, since peers route on it.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] for an empty or whitespace tag.
    pub fn validated(self) -> Result<Self, ProtocolError> {
        if self.kind.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage("type must not be empty".into()));
        }
        Ok(self)
    }
}

/// An inbound message after the server has stamped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayFrame {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Map<String, Value>,
    pub participant_id: ParticipantId,
    pub session_code: SessionCode,
    /// Server receive time, unix milliseconds.
    pub timestamp: u64,
}

impl RelayFrame {
    /// Binds an inbound message to the connection it arrived on.
    pub fn stamp(
        msg: InboundMessage,
        participant_id: ParticipantId,
        session_code: SessionCode,
        timestamp: u64,
    ) -> Self {
        Self {
            kind: msg.kind,
            payload: msg.payload,
            participant_id,
            session_code,
            timestamp,
        }
    }
}
