//! Per-connection handler: greet, register, announce, then hand off to the
//! adapter.
//!
//! Each upgraded connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Queue the `connected` greeting on the fresh record
//!   2. Register with the hub → learn the session's connection count
//!   3. Broadcast `player_joined` with that count
//!   4. Run the inbound and outbound loops until the connection ends

use std::sync::Arc;

use chit_protocol::{Codec, Event, ParticipantId, SessionCode};
use chit_transport::WebSocketConnection;

use crate::ChitError;
use crate::adapter::Binding;
use crate::server::ServerState;

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ChitError>
where
    C: Codec + Clone,
{
    let binding = Binding {
        connection: conn.id(),
        session: SessionCode::new(&conn.params().session_code),
        participant: ParticipantId::new(&conn.params().participant_id),
    };
    tracing::debug!(
        connection = %binding.connection,
        addr = %conn.peer_addr(),
        "handling new connection"
    );

    let (record, queue) = state.hub.connection(
        binding.connection,
        binding.session.clone(),
        binding.participant.clone(),
    );

    // Queued before registration, so it precedes any broadcast.
    let greeting = Event::connected(binding.participant.clone(), binding.session.clone());
    if record.enqueue(state.codec.frame(&greeting)?).is_err() {
        tracing::warn!(connection = %binding.connection, "greeting not queued");
    }

    let player_count = state.hub.register(record).await?;
    let opened = Event::ConnectionOpened {
        participant_id: binding.participant.clone(),
        player_count,
    };
    state
        .hub
        .broadcast(&binding.session, state.codec.frame(&opened)?)
        .await?;

    let (source, sink) = conn.split();
    state.adapter.run(binding, source, sink, queue).await;
    Ok(())
}
