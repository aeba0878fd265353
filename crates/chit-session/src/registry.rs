//! The session registry: code → session.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chit_protocol::SessionCode;
use rand::Rng;

use crate::{Session, SessionError, generate_session_code};

/// All live sessions, keyed by code.
///
/// Reads (`get`, `len`, `codes`) share the lock; `create` takes it
/// exclusively. Nothing here does I/O, so the lock is never held across
/// an `.await`.
///
/// Sessions are never removed. A concluded session stays reachable by its
/// code for the life of the process.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionCode, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new empty session under `code`.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyExists`] if the code is taken. The
    /// existing session is not replaced.
    pub fn create(&self, code: SessionCode) -> Result<Arc<Session>, SessionError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.contains_key(&code) {
            return Err(SessionError::AlreadyExists(code));
        }
        let session = Arc::new(Session::new(code.clone()));
        sessions.insert(code.clone(), Arc::clone(&session));
        tracing::info!(session = %code, "session created");
        Ok(session)
    }

    /// Registers a new session under a freshly generated code, retrying
    /// on collision.
    pub fn create_unique(&self) -> Arc<Session> {
        self.create_unique_with(&mut rand::rng())
    }

    /// Like [`create_unique`](Self::create_unique) with a caller-supplied
    /// RNG.
    pub fn create_unique_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Arc<Session> {
        loop {
            let code = generate_session_code(rng);
            match self.create(code) {
                Ok(session) => return session,
                Err(e) => tracing::debug!(error = %e, "session code collision, retrying"),
            }
        }
    }

    /// Looks up a session by code.
    pub fn get(&self, code: &SessionCode) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .cloned()
    }

    /// Returns the number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every registered code, in no particular order.
    pub fn codes(&self) -> Vec<SessionCode> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chit_protocol::{Participant, ParticipantId, SessionStatus};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn code(c: &str) -> SessionCode {
        SessionCode::new(c)
    }

    #[test]
    fn test_get_unknown_code_returns_none() {
        let registry = SessionRegistry::new();
        assert!(registry.get(&code("NOPE")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_then_get_returns_empty_forming_session() {
        let registry = SessionRegistry::new();
        registry.create(code("AB12")).expect("should create");

        let session = registry.get(&code("AB12")).expect("should exist");
        assert_eq!(session.participant_count(), 0);
        assert_eq!(session.status(), SessionStatus::Forming);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_existing_code_fails_and_keeps_original() {
        let registry = SessionRegistry::new();
        let original = registry.create(code("AB12")).unwrap();
        original.add_participant(Participant::new(ParticipantId::new("a"), "Asha"));

        let result = registry.create(code("AB12"));

        assert!(matches!(result, Err(SessionError::AlreadyExists(c)) if c == code("AB12")));
        let kept = registry.get(&code("AB12")).unwrap();
        assert!(Arc::ptr_eq(&original, &kept));
        assert_eq!(kept.participant_count(), 1);
    }

    #[test]
    fn test_create_unique_with_retries_on_collision() {
        let registry = SessionRegistry::new();
        // Same seed twice: the second call's first candidate collides.
        let first = registry.create_unique_with(&mut StdRng::seed_from_u64(3));
        let second = registry.create_unique_with(&mut StdRng::seed_from_u64(3));

        assert_ne!(first.code(), second.code());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_codes_lists_every_session() {
        let registry = SessionRegistry::new();
        registry.create(code("AAAA")).unwrap();
        registry.create(code("BBBB")).unwrap();

        let mut codes = registry.codes();
        codes.sort();
        assert_eq!(codes, vec![code("AAAA"), code("BBBB")]);
    }

    #[test]
    fn test_create_concurrent_same_code_exactly_one_wins() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.create(code("RACE")).is_ok())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(registry.len(), 1);
    }
}
