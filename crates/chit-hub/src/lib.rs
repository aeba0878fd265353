//! Connection hub for Chit.
//!
//! One control-loop task owns every live connection, grouped by session.
//! Everything else talks to it through a cloneable [`HubHandle`]:
//!
//! ```text
//!  Lobby ─────┐
//!  Adapter ───┼──▶ command channel ──▶ ConnectionHub loop ──try_send──▶ per-connection queues
//!  Adapter ───┘                              │
//!                                  HashMap<SessionCode, Vec<ConnectionRecord>>
//! ```
//!
//! Because the loop is the only code that touches the map, no lock guards
//! it. Queries are answered by the loop too, so a count taken right after a
//! broadcast already reflects any connections that broadcast evicted.
//!
//! Delivery never waits on a connection: a full or closed outbound queue
//! gets its connection removed on the spot.

mod config;
mod error;
mod hub;
mod record;

pub use config::HubConfig;
pub use error::HubError;
pub use hub::{ConnectionHub, HubHandle};
pub use record::ConnectionRecord;
