//! Wire protocol for Chit.
//!
//! This crate defines what travels between server and clients:
//!
//! - **Types** ([`SessionCode`], [`ParticipantId`], [`Role`],
//!   [`SessionStatus`], [`Participant`]): the game's vocabulary.
//! - **Events** ([`Event`], [`InboundMessage`], [`RelayFrame`]): the
//!   `{type, payload}` envelopes pushed over each connection.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those are turned
//!   into [`Frame`]s and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! It knows nothing about sockets, sessions or the hub.

mod codec;
mod error;
mod event;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use event::{Event, InboundMessage, RelayFrame};
pub use types::{
    Frame, Participant, ParticipantId, Role, SessionCode, SessionStatus,
};
