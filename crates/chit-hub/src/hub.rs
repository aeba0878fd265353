//! The hub control loop and its handle.

use std::collections::HashMap;

use chit_protocol::{Frame, ParticipantId, SessionCode};
use chit_transport::ConnectionId;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::{ConnectionRecord, HubConfig, HubError};

/// Commands sent to the hub loop through its channel.
///
/// Variants with a `reply` are request/response; the rest are
/// fire-and-forget.
enum HubCommand {
    /// Add a connection. Replies with the session's connection count.
    Register {
        record: ConnectionRecord,
        reply: oneshot::Sender<usize>,
    },

    /// Remove a connection if still present. Replies with the session's
    /// remaining connection count.
    Unregister {
        session: SessionCode,
        connection: ConnectionId,
        reply: oneshot::Sender<usize>,
    },

    /// Deliver a frame to every connection in a session.
    Broadcast { session: SessionCode, frame: Frame },

    /// Deliver a frame to every connection of one participant.
    SendTo {
        session: SessionCode,
        participant: ParticipantId,
        frame: Frame,
    },

    ConnectionCount {
        session: SessionCode,
        reply: oneshot::Sender<usize>,
    },

    SessionCodes {
        reply: oneshot::Sender<Vec<SessionCode>>,
    },

    /// Stop the loop. Every registered queue is closed.
    Shutdown,
}

impl std::fmt::Debug for HubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Register { .. } => "Register",
            Self::Unregister { .. } => "Unregister",
            Self::Broadcast { .. } => "Broadcast",
            Self::SendTo { .. } => "SendTo",
            Self::ConnectionCount { .. } => "ConnectionCount",
            Self::SessionCodes { .. } => "SessionCodes",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

/// Handle to a running hub. Cheap to clone: it wraps an `mpsc::Sender`.
#[derive(Debug, Clone)]
pub struct HubHandle {
    sender: mpsc::Sender<HubCommand>,
    outbound_capacity: usize,
}

impl HubHandle {
    /// Creates a record sized with this hub's outbound capacity.
    ///
    /// The record is not registered yet; frames queued on it before
    /// [`register`](Self::register) are delivered first.
    pub fn connection(
        &self,
        id: ConnectionId,
        session: SessionCode,
        participant: ParticipantId,
    ) -> (ConnectionRecord, mpsc::Receiver<Frame>) {
        ConnectionRecord::new(id, session, participant, self.outbound_capacity)
    }

    /// Registers a connection and returns its session's connection count,
    /// including the new one.
    pub async fn register(&self, record: ConnectionRecord) -> Result<usize, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Register { record, reply }).await?;
        rx.await.map_err(|_| HubError::Unavailable)
    }

    /// Unregisters a connection and returns how many remain in its session.
    ///
    /// Unregistering a connection the hub already dropped is not an error.
    pub async fn unregister(
        &self,
        session: &SessionCode,
        connection: ConnectionId,
    ) -> Result<usize, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Unregister {
            session: session.clone(),
            connection,
            reply,
        })
        .await?;
        rx.await.map_err(|_| HubError::Unavailable)
    }

    /// Queues a frame for every connection in `session`.
    ///
    /// Returns once the hub has accepted the command, not once the frame is
    /// written.
    pub async fn broadcast(&self, session: &SessionCode, frame: Frame) -> Result<(), HubError> {
        self.send(HubCommand::Broadcast {
            session: session.clone(),
            frame,
        })
        .await
    }

    /// Queues a frame for every connection of `participant` in `session`.
    pub async fn send_to(
        &self,
        session: &SessionCode,
        participant: &ParticipantId,
        frame: Frame,
    ) -> Result<(), HubError> {
        self.send(HubCommand::SendTo {
            session: session.clone(),
            participant: participant.clone(),
            frame,
        })
        .await
    }

    /// Returns the number of live connections in `session`.
    pub async fn connection_count(&self, session: &SessionCode) -> Result<usize, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::ConnectionCount {
            session: session.clone(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| HubError::Unavailable)
    }

    /// Returns the codes of every session with at least one connection.
    pub async fn session_codes(&self) -> Result<Vec<SessionCode>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::SessionCodes { reply }).await?;
        rx.await.map_err(|_| HubError::Unavailable)
    }

    /// Tells the hub to stop.
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.send(HubCommand::Shutdown).await
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), HubError> {
        self.sender.send(cmd).await.map_err(|_| HubError::Unavailable)
    }
}

/// The hub loop state. Runs inside its own Tokio task.
pub struct ConnectionHub {
    /// Connections per session, in registration order. A session with no
    /// connections has no entry.
    sessions: HashMap<SessionCode, Vec<ConnectionRecord>>,
    receiver: mpsc::Receiver<HubCommand>,
}

impl ConnectionHub {
    /// Spawns a hub loop and returns a handle to it.
    ///
    /// The loop runs until [`HubHandle::shutdown`] or until every handle is
    /// dropped.
    pub fn spawn(config: HubConfig) -> HubHandle {
        let config = config.validated();
        let (sender, receiver) = mpsc::channel(config.command_capacity);

        let hub = Self {
            sessions: HashMap::new(),
            receiver,
        };
        tokio::spawn(hub.run());

        HubHandle {
            sender,
            outbound_capacity: config.outbound_capacity,
        }
    }

    async fn run(mut self) {
        tracing::info!("connection hub started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                HubCommand::Register { record, reply } => {
                    let count = self.handle_register(record);
                    let _ = reply.send(count);
                }
                HubCommand::Unregister {
                    session,
                    connection,
                    reply,
                } => {
                    let count = self.handle_unregister(&session, connection);
                    let _ = reply.send(count);
                }
                HubCommand::Broadcast { session, frame } => {
                    self.deliver(&session, None, &frame);
                }
                HubCommand::SendTo {
                    session,
                    participant,
                    frame,
                } => {
                    self.deliver(&session, Some(&participant), &frame);
                }
                HubCommand::ConnectionCount { session, reply } => {
                    let _ = reply.send(self.count(&session));
                }
                HubCommand::SessionCodes { reply } => {
                    let _ = reply.send(self.sessions.keys().cloned().collect());
                }
                HubCommand::Shutdown => {
                    tracing::info!("connection hub shutting down");
                    break;
                }
            }
        }

        tracing::info!(
            sessions = self.sessions.len(),
            "connection hub stopped"
        );
    }

    fn handle_register(&mut self, record: ConnectionRecord) -> usize {
        let session = record.session().clone();
        tracing::info!(
            session = %session,
            participant = %record.participant(),
            connection = %record.id(),
            "connection registered"
        );
        let set = self.sessions.entry(session).or_default();
        set.push(record);
        set.len()
    }

    fn handle_unregister(&mut self, session: &SessionCode, connection: ConnectionId) -> usize {
        let Some(set) = self.sessions.get_mut(session) else {
            return 0;
        };
        if let Some(pos) = set.iter().position(|r| r.id() == connection) {
            // Dropping the record closes its queue.
            let record = set.remove(pos);
            tracing::info!(
                session = %session,
                participant = %record.participant(),
                connection = %connection,
                "connection unregistered"
            );
        }
        let remaining = set.len();
        if remaining == 0 {
            self.sessions.remove(session);
        }
        remaining
    }

    /// Offers `frame` to each matching connection without waiting. A
    /// connection whose queue is full or closed is removed.
    fn deliver(
        &mut self,
        session: &SessionCode,
        participant: Option<&ParticipantId>,
        frame: &Frame,
    ) {
        let Some(set) = self.sessions.get_mut(session) else {
            tracing::debug!(session = %session, "no connections to deliver to");
            return;
        };

        set.retain(|record| {
            if participant.is_some_and(|p| p != record.participant()) {
                return true;
            }
            match record.enqueue(frame.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        session = %session,
                        participant = %record.participant(),
                        connection = %record.id(),
                        "outbound queue full, dropping slow connection"
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        session = %session,
                        connection = %record.id(),
                        "outbound queue closed, dropping connection"
                    );
                    false
                }
            }
        });

        if set.is_empty() {
            self.sessions.remove(session);
        }
    }

    fn count(&self, session: &SessionCode) -> usize {
        self.sessions.get(session).map_or(0, Vec::len)
    }
}
