//! # Chit
//!
//! Real-time session server for the four-player chit game *Raja Mantri Chor
//! Sipahi*.
//!
//! Players open a session, share its four-character code, and connect over
//! WebSocket. Once four have joined, roles are dealt privately; the Mantri
//! gets one guess at who holds the Chor chit, and everyone is scored from a
//! fixed 2300-point table.
//!
//! ## Layers
//!
//! - [`chit_session`]: the session registry and per-session state
//! - [`chit_round`]: role dealing and guess scoring
//! - [`chit_hub`]: the single control loop that fans frames out to
//!   connections
//! - [`ConnectionAdapter`]: per-connection inbound and outbound loops with
//!   heartbeat
//! - [`Lobby`]: request-layer operations (create, join, start, guess)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chit::prelude::*;
//!
//! # async fn start() -> Result<(), ChitError> {
//! let server = ChitServer::builder().bind("0.0.0.0:8080").build().await?;
//! let lobby = server.lobby();
//! let ticket = lobby.create_session("Asha").await?;
//! // Clients connect to ws://host/ws/{code}?playerId={participant_id}
//! # let _ = ticket;
//! server.run().await
//! # }
//! ```

mod adapter;
mod error;
mod handler;
mod heartbeat;
mod lobby;
mod server;

pub use adapter::{Binding, ConnectionAdapter};
pub use error::{ChitError, ErrorKind};
pub use heartbeat::HeartbeatConfig;
pub use lobby::{Lobby, PlayerSummary, SessionDetails, SessionTicket};
pub use server::{ChitServer, ChitServerBuilder};

pub use chit_hub;
pub use chit_protocol;
pub use chit_round;
pub use chit_session;
pub use chit_transport;

pub mod prelude {
    //! Everything needed to run a server and drive sessions.

    pub use crate::{
        ChitError, ChitServer, ChitServerBuilder, ErrorKind, HeartbeatConfig, Lobby,
        SessionDetails, SessionTicket,
    };
    pub use chit_hub::HubConfig;
    pub use chit_protocol::{Event, ParticipantId, Role, SessionCode, SessionStatus};
    pub use chit_round::GuessOutcome;
}
