//! Session state and registry for Chit.
//!
//! Two pieces live here:
//!
//! 1. **[`Session`]**: one game's participant list and status, guarded by
//!    its own mutex. Every mutation is a single short critical section.
//! 2. **[`SessionRegistry`]**: the map from [`SessionCode`] to
//!    `Arc<Session>`, behind a reader-writer lock.
//!
//! ```text
//! Round / Lobby (above)  ← snapshot, decide, replace
//!     ↕
//! Session Layer (this crate)  ← synchronized state, no I/O
//!     ↕
//! Protocol Layer (below)  ← Participant, SessionStatus, ids
//! ```
//!
//! The two locks are never held together: the registry hands out an
//! `Arc<Session>` and releases its lock before the caller touches the
//! session.
//!
//! [`SessionCode`]: chit_protocol::SessionCode

mod error;
mod ids;
mod registry;
mod session;

pub use error::SessionError;
pub use ids::{generate_participant_id, generate_session_code};
pub use registry::SessionRegistry;
pub use session::{MAX_PARTICIPANTS, Session, Snapshot};
