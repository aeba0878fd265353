//! Error types for the round engine.

/// Errors returned by [`process_guess`](crate::process_guess).
///
/// The messages are fixed: clients match on the exact text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    /// At least one of the four roles has no holder, either because roles
    /// were never dealt or because the session is malformed.
    #[error("session does not have all required roles assigned")]
    RolesNotAssigned,

    /// The acting participant does not hold the accuser role.
    #[error("only the Mantri can make a guess")]
    UnauthorizedActor,

    /// The single guess has already been scored, possibly by a concurrent
    /// caller working from the same snapshot.
    #[error("round has already concluded")]
    AlreadyConcluded,
}
