//! Request-layer operations: create, join, inspect, start, guess.
//!
//! A request router (HTTP or otherwise) maps each call here 1:1. The lobby
//! validates input, gates on session status, drives the round engine, and
//! pushes the resulting events through the hub.

use std::sync::Arc;

use chit_hub::HubHandle;
use chit_protocol::{
    Codec, Event, JsonCodec, Participant, ParticipantId, SessionCode, SessionStatus,
};
use chit_round::{GuessOutcome, RoundError};
use chit_session::{MAX_PARTICIPANTS, Session, SessionError, SessionRegistry, generate_participant_id};
use serde::Serialize;

use crate::ChitError;

/// What a participant needs to open a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTicket {
    pub code: SessionCode,
    pub participant_id: ParticipantId,
}

/// Public view of one participant. Roles stay private.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSummary {
    pub id: ParticipantId,
    pub name: String,
    pub score: u32,
}

/// Public view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDetails {
    pub code: SessionCode,
    pub status: SessionStatus,
    pub players: Vec<PlayerSummary>,
}

/// The boundary service behind the request layer.
///
/// Cheap to clone: the registry is shared and the hub handle is a channel
/// sender.
#[derive(Debug, Clone)]
pub struct Lobby<C = JsonCodec> {
    registry: Arc<SessionRegistry>,
    hub: HubHandle,
    codec: C,
}

impl<C: Codec + Clone> Lobby<C> {
    pub fn new(registry: Arc<SessionRegistry>, hub: HubHandle, codec: C) -> Self {
        Self { registry, hub, codec }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Opens a new session with `host_name` as its first participant.
    ///
    /// # Errors
    /// [`ChitError::Validation`] if the name is blank.
    pub async fn create_session(&self, host_name: &str) -> Result<SessionTicket, ChitError> {
        let name = required(host_name, "playerName is required")?;

        let session = self.registry.create_unique();
        let participant = Participant::new(generate_participant_id(), name);
        let ticket = SessionTicket {
            code: session.code().clone(),
            participant_id: participant.id.clone(),
        };
        // A fresh session always has room for its host.
        session.add_participant(participant);

        tracing::info!(
            session = %ticket.code,
            participant = %ticket.participant_id,
            "session opened by host"
        );
        self.announce_join(&ticket, name).await?;
        Ok(ticket)
    }

    /// Adds a participant to an existing session.
    ///
    /// # Errors
    /// - [`ChitError::Validation`] if the code or name is blank.
    /// - [`SessionError::NotFound`] for an unknown code.
    /// - [`SessionError::InvalidStatus`] once roles have been dealt.
    /// - [`SessionError::Full`] if four have already joined.
    pub async fn join_session(&self, code: &SessionCode, name: &str) -> Result<SessionTicket, ChitError> {
        required(code.as_str(), "session code is required")?;
        let name = required(name, "playerName is required")?;
        let session = self.session(code)?;

        let status = session.status();
        if !status.is_joinable() {
            return Err(invalid_status(code, status));
        }

        let participant = Participant::new(generate_participant_id(), name);
        let ticket = SessionTicket {
            code: code.clone(),
            participant_id: participant.id.clone(),
        };
        if !session.add_participant(participant) {
            return Err(SessionError::Full(code.clone()).into());
        }

        tracing::info!(
            session = %code,
            participant = %ticket.participant_id,
            players = session.participant_count(),
            "participant joined"
        );
        self.announce_join(&ticket, name).await?;
        Ok(ticket)
    }

    /// Returns the public view of a session.
    pub fn session_details(&self, code: &SessionCode) -> Result<SessionDetails, ChitError> {
        let snapshot = self.session(code)?.snapshot();
        Ok(SessionDetails {
            code: code.clone(),
            status: snapshot.status,
            players: snapshot
                .participants
                .into_iter()
                .map(|p| PlayerSummary {
                    id: p.id,
                    name: p.name,
                    score: p.score,
                })
                .collect(),
        })
    }

    /// Deals roles, broadcasts `GAME_START`, then sends every participant
    /// their own `YOUR_ROLE`.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] for an unknown code.
    /// - [`SessionError::InvalidStatus`] if the session is past `Forming`,
    ///   including when a concurrent call dealt first.
    /// - [`ChitError::Validation`] unless exactly four have joined.
    pub async fn start_round(&self, code: &SessionCode) -> Result<(), ChitError> {
        required(code.as_str(), "session code is required")?;
        let session = self.session(code)?;

        let status = session.status();
        if status != SessionStatus::Forming {
            return Err(invalid_status(code, status));
        }
        if session.participant_count() != MAX_PARTICIPANTS {
            return Err(ChitError::Validation(
                "Need exactly 4 players to start game".into(),
            ));
        }
        if !chit_round::assign_roles(&session) {
            // Four is the cap, so only a concurrent start can get here.
            return Err(invalid_status(code, session.status()));
        }

        self.hub.broadcast(code, self.codec.frame(&Event::game_start())?).await?;

        for participant in session.snapshot().participants {
            let Some(role) = participant.role else {
                continue;
            };
            let event = Event::YourRole {
                role,
                name: participant.name,
            };
            self.hub
                .send_to(code, &participant.id, self.codec.frame(&event)?)
                .await?;
        }

        tracing::info!(session = %code, "round started");
        Ok(())
    }

    /// Scores the accuser's guess, then broadcasts `GUESS_RESULT` and
    /// `GAME_END`.
    ///
    /// # Errors
    /// - [`ChitError::Validation`] if any id is blank.
    /// - [`SessionError::NotFound`] for an unknown code.
    /// - [`ChitError::RoundAlreadyConcluded`] if the guess was already made,
    ///   including by a concurrent call.
    /// - [`RoundError`] from the engine.
    pub async fn submit_guess(
        &self,
        code: &SessionCode,
        actor: &ParticipantId,
        accused: &ParticipantId,
    ) -> Result<GuessOutcome, ChitError> {
        if [code.as_str(), actor.as_str(), accused.as_str()]
            .iter()
            .any(|s| s.trim().is_empty())
        {
            return Err(ChitError::Validation(
                "session code, accuser id and accused id are required".into(),
            ));
        }
        let session = self.session(code)?;

        let outcome = chit_round::process_guess(&session, actor, accused).map_err(|e| match e {
            RoundError::AlreadyConcluded => ChitError::RoundAlreadyConcluded(code.clone()),
            other => other.into(),
        })?;

        let result = Event::GuessResult {
            accuser_name: outcome.accuser_name.clone(),
            correct: outcome.correct,
            scores: outcome.scores.clone(),
        };
        self.hub.broadcast(code, self.codec.frame(&result)?).await?;

        let end = Event::game_end(outcome.scores_by_name.clone());
        self.hub.broadcast(code, self.codec.frame(&end)?).await?;

        Ok(outcome)
    }

    fn session(&self, code: &SessionCode) -> Result<Arc<Session>, ChitError> {
        self.registry
            .get(code)
            .ok_or_else(|| SessionError::NotFound(code.clone()).into())
    }

    async fn announce_join(&self, ticket: &SessionTicket, name: &str) -> Result<(), ChitError> {
        let event = Event::PlayerJoined {
            name: name.to_string(),
            player_id: ticket.participant_id.clone(),
        };
        self.hub.broadcast(&ticket.code, self.codec.frame(&event)?).await?;
        Ok(())
    }
}

fn invalid_status(code: &SessionCode, status: SessionStatus) -> ChitError {
    SessionError::InvalidStatus {
        code: code.clone(),
        status,
    }
    .into()
}

/// Trims `value` and rejects it if nothing is left.
fn required<'a>(value: &'a str, message: &str) -> Result<&'a str, ChitError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ChitError::Validation(message.to_string()));
    }
    Ok(trimmed)
}
