//! The round engine for Chit.
//!
//! A round is one pass through the session state machine:
//!
//! ```text
//! [Forming] ──assign_roles()──→ [RoleAssigned] ──process_guess()──→ [Concluded]
//! ```
//!
//! Both operations follow the same shape: take a [`Snapshot`], compute the
//! next participant list off-lock, then commit it with a single
//! [`Session::replace`]. Readers never see half-assigned roles or
//! half-applied scores.
//!
//! The engine does not gate on status. [`process_guess`] run twice on the
//! same session scores twice; callers check `RoleAssigned` first.
//!
//! [`Snapshot`]: chit_session::Snapshot
//! [`Session::replace`]: chit_session::Session::replace

mod engine;
mod error;
mod scoring;

pub use engine::{GuessOutcome, assign_roles, assign_roles_with, process_guess};
pub use error::RoundError;
pub use scoring::{PRIZE_POOL, score_for};
