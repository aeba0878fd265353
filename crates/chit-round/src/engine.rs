//! Role assignment and guess processing.

use std::collections::BTreeMap;

use chit_protocol::{ParticipantId, Role, SessionStatus};
use chit_session::{MAX_PARTICIPANTS, Session};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::{RoundError, score_for};

/// The result of the accuser's guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessOutcome {
    pub correct: bool,
    pub accuser: ParticipantId,
    pub accuser_name: String,
    pub accused: ParticipantId,
    /// Who actually held the target role.
    pub actual_target: ParticipantId,
    /// Final score per participant id.
    pub scores: BTreeMap<ParticipantId, u32>,
    /// Final score per display name.
    pub scores_by_name: BTreeMap<String, u32>,
}

/// Deals the four roles using the thread-local RNG.
///
/// See [`assign_roles_with`].
pub fn assign_roles(session: &Session) -> bool {
    assign_roles_with(session, &mut rand::rng())
}

/// Deals the four roles, one per participant, in a uniformly random order.
///
/// Does nothing and returns `false` unless the session is `Forming` with
/// exactly four participants. On success the roles are committed together
/// with the `RoleAssigned` status in one [`Session::replace_if`], so of two
/// concurrent callers only one deals.
pub fn assign_roles_with<R: Rng + ?Sized>(session: &Session, rng: &mut R) -> bool {
    let snapshot = session.snapshot();
    if snapshot.status != SessionStatus::Forming {
        tracing::debug!(
            session = %session.code(),
            status = ?snapshot.status,
            "not dealing roles: session is past forming"
        );
        return false;
    }
    if snapshot.participants.len() != MAX_PARTICIPANTS {
        tracing::debug!(
            session = %session.code(),
            participants = snapshot.participants.len(),
            "not dealing roles: need exactly four participants"
        );
        return false;
    }

    let mut roles = Role::ALL;
    roles.shuffle(rng);

    let participants = snapshot
        .participants
        .into_iter()
        .zip(roles)
        .map(|(mut participant, role)| {
            participant.role = Some(role);
            participant
        })
        .collect();

    if !session.replace_if(SessionStatus::Forming, participants, SessionStatus::RoleAssigned) {
        tracing::debug!(session = %session.code(), "roles already dealt concurrently");
        return false;
    }
    tracing::info!(session = %session.code(), "roles assigned");
    true
}

/// Applies the accuser's single guess and concludes the round.
///
/// `correct` is whether `accused` holds the target role. Every participant
/// is scored from the fixed table, and the scores are committed with the
/// `Concluded` status.
///
/// # Errors
/// - [`RoundError::AlreadyConcluded`] if the session is already
///   `Concluded`, or another guess concluded it first.
/// - [`RoundError::RolesNotAssigned`] if any of the four roles has no holder.
/// - [`RoundError::UnauthorizedActor`] if `actor` is not the accuser.
///
/// On error the session is left unchanged.
pub fn process_guess(
    session: &Session,
    actor: &ParticipantId,
    accused: &ParticipantId,
) -> Result<GuessOutcome, RoundError> {
    let snapshot = session.snapshot();
    if snapshot.status == SessionStatus::Concluded {
        return Err(RoundError::AlreadyConcluded);
    }

    let holder = |role: Role| {
        snapshot
            .participants
            .iter()
            .find(|p| p.role == Some(role))
            .ok_or(RoundError::RolesNotAssigned)
    };
    let accuser = holder(Role::Accuser)?;
    let target = holder(Role::Target)?;
    holder(Role::Authority)?;
    holder(Role::Guard)?;

    if accuser.id != *actor {
        tracing::debug!(
            session = %session.code(),
            participant = %actor,
            "guess refused: not the accuser"
        );
        return Err(RoundError::UnauthorizedActor);
    }

    let correct = target.id == *accused;
    let accuser_name = accuser.name.clone();
    let actual_target = target.id.clone();

    let participants: Vec<_> = snapshot
        .participants
        .iter()
        .cloned()
        .map(|mut participant| {
            if let Some(role) = participant.role {
                participant.score = score_for(role, correct);
            }
            participant
        })
        .collect();

    let scores = participants
        .iter()
        .map(|p| (p.id.clone(), p.score))
        .collect();
    let scores_by_name = participants
        .iter()
        .map(|p| (p.name.clone(), p.score))
        .collect();

    if !session.replace_if(snapshot.status, participants, SessionStatus::Concluded) {
        tracing::debug!(
            session = %session.code(),
            participant = %actor,
            "guess refused: round concluded concurrently"
        );
        return Err(RoundError::AlreadyConcluded);
    }
    tracing::info!(session = %session.code(), correct, "round concluded");

    Ok(GuessOutcome {
        correct,
        accuser: actor.clone(),
        accuser_name,
        accused: accused.clone(),
        actual_target,
        scores,
        scores_by_name,
    })
}
