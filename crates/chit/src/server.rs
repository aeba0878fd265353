//! `ChitServer` builder and accept loop.
//!
//! This is the entry point for running a Chit session server. It ties the
//! layers together: transport → hub → adapter, with the [`Lobby`] sharing
//! the same registry and hub for request-layer operations.

use std::net::SocketAddr;
use std::sync::Arc;

use chit_hub::{ConnectionHub, HubConfig, HubHandle};
use chit_protocol::{Codec, JsonCodec, SessionCode};
use chit_session::SessionRegistry;
use chit_transport::{Rejection, WebSocketTransport};

use crate::adapter::ConnectionAdapter;
use crate::handler::handle_connection;
use crate::{ChitError, HeartbeatConfig, Lobby};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C> {
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) hub: HubHandle,
    pub(crate) codec: C,
    pub(crate) adapter: ConnectionAdapter<C>,
}

/// Builder for configuring and starting a Chit server.
///
/// # Example
///
/// ```rust,no_run
/// use chit::prelude::*;
///
/// # async fn start() -> Result<(), ChitError> {
/// let server = ChitServer::builder().bind("0.0.0.0:8080").build().await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChitServerBuilder {
    bind_addr: String,
    hub: HubConfig,
    heartbeat: HeartbeatConfig,
}

impl ChitServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            hub: HubConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn hub_config(mut self, config: HubConfig) -> Self {
        self.hub = config;
        self
    }

    pub fn heartbeat(mut self, config: HeartbeatConfig) -> Self {
        self.heartbeat = config;
        self
    }

    /// Spawns the hub and binds the listener.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<ChitServer<JsonCodec>, ChitError> {
        let hub = ConnectionHub::spawn(self.hub);
        let codec = JsonCodec;
        let adapter = ConnectionAdapter::new(hub.clone(), codec, self.heartbeat);
        let transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_read_limits(adapter.heartbeat().read_limits());

        let state = Arc::new(ServerState {
            registry: Arc::new(SessionRegistry::new()),
            adapter,
            hub,
            codec,
        });

        Ok(ChitServer { transport, state })
    }
}

impl Default for ChitServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Chit server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ChitServer<C = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl ChitServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ChitServerBuilder {
        ChitServerBuilder::new()
    }
}

impl<C: Codec + Clone> ChitServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// A lobby sharing this server's registry and hub.
    pub fn lobby(&self) -> Lobby<C> {
        Lobby::new(
            Arc::clone(&self.state.registry),
            self.state.hub.clone(),
            self.state.codec.clone(),
        )
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.state.registry
    }

    pub fn hub(&self) -> &HubHandle {
        &self.state.hub
    }

    /// Runs the accept loop.
    ///
    /// Each accepted TCP stream gets its own task, which completes the
    /// upgrade (rejecting unknown sessions with 404) and then runs the
    /// connection handler. Runs until the process is terminated.
    pub async fn run(self) -> Result<(), ChitError> {
        tracing::info!("Chit server running");

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let registry = Arc::clone(&state.registry);
                        let gate = move |params: &chit_transport::ConnectParams| {
                            match registry.get(&SessionCode::new(&params.session_code)) {
                                Some(_) => Ok(()),
                                None => Err(Rejection::not_found("Room not found")),
                            }
                        };

                        let conn = match pending.upgrade(gate).await {
                            Ok(conn) => conn,
                            Err(e) => {
                                tracing::debug!(error = %e, "upgrade failed");
                                return;
                            }
                        };

                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
