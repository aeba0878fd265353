//! One session's participant list and status.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chit_protocol::{Participant, SessionCode, SessionStatus};

/// Sessions are fixed at four participants.
pub const MAX_PARTICIPANTS: usize = 4;

/// A consistent point-in-time copy of a session.
///
/// Owns its data: mutating a snapshot never touches the session. Commit
/// changes back with [`Session::replace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// In join order.
    pub participants: Vec<Participant>,
    pub status: SessionStatus,
}

/// Fields guarded by the session mutex.
#[derive(Debug, Default)]
struct Roster {
    participants: Vec<Participant>,
    status: SessionStatus,
}

/// A live session.
///
/// ## Lifecycle
///
/// ```text
/// new() ──→ [Forming] ──add_participant() × 4──→ replace_if(Forming, .., RoleAssigned)
///                                                                 │
///                                                                 ▼
///                            [Concluded] ←── replace_if(RoleAssigned, .., Concluded)
/// ```
///
/// Each method takes the mutex once and releases it before returning, so
/// callers never hold a session lock across an `.await`.
#[derive(Debug)]
pub struct Session {
    code: SessionCode,
    inner: Mutex<Roster>,
}

impl Session {
    /// Creates an empty session in `Forming` status.
    pub fn new(code: SessionCode) -> Self {
        Self {
            code,
            inner: Mutex::new(Roster::default()),
        }
    }

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Appends a participant.
    ///
    /// Returns `false` without changing anything if the session already
    /// has [`MAX_PARTICIPANTS`] or already holds this participant id.
    pub fn add_participant(&self, participant: Participant) -> bool {
        let mut roster = self.lock();
        if roster.participants.len() >= MAX_PARTICIPANTS {
            tracing::debug!(session = %self.code, "refused participant: session full");
            return false;
        }
        if roster.participants.iter().any(|p| p.id == participant.id) {
            tracing::debug!(
                session = %self.code,
                participant = %participant.id,
                "refused participant: already joined"
            );
            return false;
        }
        roster.participants.push(participant);
        true
    }

    /// Copies the participants and status under one lock acquisition.
    pub fn snapshot(&self) -> Snapshot {
        let roster = self.lock();
        Snapshot {
            participants: roster.participants.clone(),
            status: roster.status,
        }
    }

    /// Atomically swaps the participant list and status.
    ///
    /// Readers see either the old pair or the new pair, never a mix.
    pub fn replace(&self, participants: Vec<Participant>, status: SessionStatus) {
        let mut roster = self.lock();
        roster.participants = participants;
        roster.status = status;
    }

    /// Like [`replace`](Self::replace), but only if the status is still
    /// `expected`.
    ///
    /// Returns `false` and leaves the session untouched otherwise. This is
    /// how a status transition commits exactly once when callers race from
    /// the same snapshot.
    pub fn replace_if(
        &self,
        expected: SessionStatus,
        participants: Vec<Participant>,
        status: SessionStatus,
    ) -> bool {
        let mut roster = self.lock();
        if roster.status != expected {
            return false;
        }
        roster.participants = participants;
        roster.status = status;
        true
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    pub fn participant_count(&self) -> usize {
        self.lock().participants.len()
    }

    /// Every write under the lock is a single push or assignment, so a
    /// poisoned roster is still consistent.
    fn lock(&self) -> MutexGuard<'_, Roster> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
