//! Core protocol types: identities, roles, statuses and frames.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The short code that identifies a session (e.g. `"K7QZ"`).
///
/// Newtype over `String` so a code can't be passed where a participant id
/// is expected. `#[serde(transparent)]` keeps it a bare string on the wire.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// An opaque participant identifier, unique per process.
///
/// Ordered so it can key the `BTreeMap` score tables, which gives the
/// serialized score maps a stable key order.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// One of the four mutually exclusive roles drawn each round.
///
/// The wire uses the traditional chit names, which is also what players see
/// in `YOUR_ROLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Always scores 1000.
    #[serde(rename = "Raja")]
    Authority,
    /// Makes the single guess. 800 if right, 0 if wrong.
    #[serde(rename = "Mantri")]
    Accuser,
    /// Always scores 500.
    #[serde(rename = "Sipahi")]
    Guard,
    /// The one to be found. 0 if caught, 800 if not.
    #[serde(rename = "Chor")]
    Target,
}

impl Role {
    /// All four roles, in canonical order.
    pub const ALL: [Role; 4] =
        [Role::Authority, Role::Accuser, Role::Guard, Role::Target];

    /// The name shown to players and used on the wire.
    pub fn traditional_name(self) -> &'static str {
        match self {
            Self::Authority => "Raja",
            Self::Accuser => "Mantri",
            Self::Guard => "Sipahi",
            Self::Target => "Chor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.traditional_name())
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a session. Strictly forward, never reopened:
///
/// ```text
/// Forming ──(4 joined, roles dealt)──→ RoleAssigned ──(guess)──→ Concluded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Accepting participants.
    #[default]
    Forming,
    /// Every participant holds a role; waiting for the guess.
    RoleAssigned,
    /// Scores are final.
    Concluded,
}

impl SessionStatus {
    /// Returns `true` while new participants may join.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Forming)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forming => write!(f, "Forming"),
            Self::RoleAssigned => write!(f, "RoleAssigned"),
            Self::Concluded => write!(f, "Concluded"),
        }
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// One joined player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// `None` until roles are dealt.
    pub role: Option<Role>,
    pub score: u32,
}

impl Participant {
    /// A freshly joined participant: no role, zero score.
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: None,
            score: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One encoded outbound message.
///
/// Backed by `Arc<[u8]>`: a broadcast clones the pointer, not the bytes,
/// for every connection it fans out to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Arc<[u8]>);

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Arc::from(bytes))
    }
}

impl From<&'static str> for Frame {
    fn from(text: &'static str) -> Self {
        Self(Arc::from(text.as_bytes()))
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
