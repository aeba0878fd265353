//! Per-connection adapter: the inbound and outbound loops.
//!
//! ```text
//!   FrameSource ──▶ inbound loop ──stamp──▶ hub.broadcast()
//!                        │ (on exit)
//!                        ▼
//!                  hub.unregister() ──▶ queue closes ──▶ outbound loop sends Close
//!                  hub.broadcast(player_left)
//!
//!   queue ──▶ outbound loop ──▶ FrameSink      (+ ping every ping_interval)
//! ```
//!
//! The only stop signal for the outbound loop is its queue closing. The
//! only stop signal for the inbound loop is the read half ending (close,
//! error, or peer timeout).

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chit_hub::HubHandle;
use chit_protocol::{Codec, Event, Frame, InboundMessage, ParticipantId, RelayFrame, SessionCode};
use chit_transport::{ConnectionId, FrameSink, FrameSource, TransportError};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::HeartbeatConfig;

/// Who a connection belongs to. Everything it relays is stamped with this,
/// whatever the client claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub connection: ConnectionId,
    pub session: SessionCode,
    pub participant: ParticipantId,
}

/// Drives one registered connection until it ends.
#[derive(Debug, Clone)]
pub struct ConnectionAdapter<C> {
    hub: HubHandle,
    codec: C,
    heartbeat: HeartbeatConfig,
}

impl<C: Codec + Clone> ConnectionAdapter<C> {
    pub fn new(hub: HubHandle, codec: C, heartbeat: HeartbeatConfig) -> Self {
        Self {
            hub,
            codec,
            heartbeat: heartbeat.validated(),
        }
    }

    pub fn heartbeat(&self) -> &HeartbeatConfig {
        &self.heartbeat
    }

    /// Runs both loops for a connection already registered with the hub.
    ///
    /// The outbound loop gets its own task; the inbound loop runs on the
    /// caller's. Returns after the inbound loop has ended, the connection
    /// has been unregistered, `player_left` has been broadcast, and the
    /// outbound loop has finished.
    pub async fn run<S, K>(&self, binding: Binding, source: S, sink: K, queue: mpsc::Receiver<Frame>)
    where
        S: FrameSource,
        K: FrameSink,
    {
        let outbound = tokio::spawn(outbound_loop(sink, queue, self.heartbeat, binding.connection));

        self.inbound_loop(&binding, source).await;
        self.depart(&binding).await;

        match outbound.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(
                connection = %binding.connection,
                error = %e,
                "outbound loop ended with error"
            ),
            Err(e) => tracing::warn!(
                connection = %binding.connection,
                error = %e,
                "outbound task failed"
            ),
        }
    }

    /// Reads until the source ends, relaying each decodable message to the
    /// session.
    async fn inbound_loop<S: FrameSource>(&self, binding: &Binding, mut source: S) {
        loop {
            let data = match source.recv().await {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::debug!(connection = %binding.connection, "connection closed by peer");
                    break;
                }
                Err(e) => {
                    tracing::debug!(connection = %binding.connection, error = %e, "read failed");
                    break;
                }
            };

            let decoded = self
                .codec
                .decode::<InboundMessage>(&data)
                .and_then(InboundMessage::validated);
            let msg = match decoded {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!(
                        connection = %binding.connection,
                        error = %e,
                        "skipping undecodable message"
                    );
                    continue;
                }
            };

            let relay = RelayFrame::stamp(
                msg,
                binding.participant.clone(),
                binding.session.clone(),
                unix_millis(),
            );
            let frame = match self.codec.frame(&relay) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!(connection = %binding.connection, error = %e, "relay encode failed");
                    continue;
                }
            };

            if self.hub.broadcast(&binding.session, frame).await.is_err() {
                tracing::debug!(connection = %binding.connection, "hub gone, ending inbound loop");
                break;
            }
        }
    }

    /// Unregisters, then tells the rest of the session.
    async fn depart(&self, binding: &Binding) {
        let remaining = match self.hub.unregister(&binding.session, binding.connection).await {
            Ok(remaining) => remaining,
            Err(e) => {
                tracing::debug!(connection = %binding.connection, error = %e, "unregister failed");
                return;
            }
        };

        let event = Event::ConnectionClosed {
            participant_id: binding.participant.clone(),
            player_count: remaining,
        };
        match self.codec.frame(&event) {
            Ok(frame) => {
                if let Err(e) = self.hub.broadcast(&binding.session, frame).await {
                    tracing::debug!(
                        connection = %binding.connection,
                        error = %e,
                        "player_left not delivered"
                    );
                }
            }
            Err(e) => tracing::debug!(error = %e, "player_left encode failed"),
        }
    }
}

/// Drains `queue` into `sink`, pinging on every heartbeat tick.
///
/// Queued frames win over a due ping. Returns `Ok` after sending a close
/// frame once the queue closes, or the first write error.
pub(crate) async fn outbound_loop<K: FrameSink>(
    mut sink: K,
    mut queue: mpsc::Receiver<Frame>,
    heartbeat: HeartbeatConfig,
    connection: ConnectionId,
) -> Result<(), TransportError> {
    let write_timeout = heartbeat.write_timeout;
    let mut ticker = tokio::time::interval_at(
        Instant::now() + heartbeat.ping_interval,
        heartbeat.ping_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            next = queue.recv() => match next {
                Some(frame) => {
                    with_deadline(write_timeout, sink.send(frame.as_bytes())).await?;
                }
                None => {
                    tracing::debug!(%connection, "queue closed, sending close frame");
                    if let Err(e) = with_deadline(write_timeout, sink.close()).await {
                        tracing::debug!(%connection, error = %e, "close frame not sent");
                    }
                    return Ok(());
                }
            },

            _ = ticker.tick() => {
                with_deadline(write_timeout, sink.ping()).await?;
            }
        }
    }
}

async fn with_deadline<F>(limit: Duration, write: F) -> Result<(), TransportError>
where
    F: Future<Output = Result<(), TransportError>>,
{
    tokio::time::timeout(limit, write)
        .await
        .map_err(|_| TransportError::WriteTimeout(limit))?
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    //! The loops are generic over the transport halves, so these tests use
    //! channel-backed mocks and paused Tokio time instead of sockets.

    use std::sync::{Arc, Mutex};

    use chit_hub::{ConnectionHub, HubConfig};
    use chit_protocol::JsonCodec;
    use serde_json::Value;

    use super::*;

    // -- Mocks ------------------------------------------------------------

    /// Replays scripted reads, then reports a clean close.
    struct ScriptedSource {
        reads: mpsc::Receiver<Vec<u8>>,
    }

    impl FrameSource for ScriptedSource {
        async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
            Ok(self.reads.recv().await)
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Written {
        Data(Vec<u8>),
        Ping,
        Close,
    }

    /// Records everything written. Optionally fails every data write.
    #[derive(Clone, Default)]
    struct RecordingSink {
        written: Arc<Mutex<Vec<Written>>>,
        fail_sends: bool,
    }

    impl RecordingSink {
        fn written(&self) -> Vec<Written> {
            self.written.lock().unwrap().clone()
        }
    }

    impl FrameSink for RecordingSink {
        async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
            if self.fail_sends {
                return Err(TransportError::ConnectionClosed("broken".into()));
            }
            self.written.lock().unwrap().push(Written::Data(data.to_vec()));
            Ok(())
        }

        async fn ping(&mut self) -> Result<(), TransportError> {
            self.written.lock().unwrap().push(Written::Ping);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.written.lock().unwrap().push(Written::Close);
            Ok(())
        }
    }

    /// A sink whose sends never complete.
    struct StuckSink;

    impl FrameSink for StuckSink {
        async fn send(&mut self, _data: &[u8]) -> Result<(), TransportError> {
            std::future::pending().await
        }

        async fn ping(&mut self) -> Result<(), TransportError> {
            std::future::pending().await
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    // -- Helpers ----------------------------------------------------------

    fn heartbeat() -> HeartbeatConfig {
        HeartbeatConfig {
            write_timeout: Duration::from_secs(1),
            ping_interval: Duration::from_secs(5),
            peer_timeout: Duration::from_secs(6),
            max_message_size: 512,
        }
    }

    fn binding(participant: &str) -> Binding {
        Binding {
            connection: ConnectionId::next(),
            session: SessionCode::new("AB12"),
            participant: ParticipantId::new(participant),
        }
    }

    fn json(frame: &Frame) -> Value {
        serde_json::from_slice(frame.as_bytes()).unwrap()
    }

    // =====================================================================
    // outbound_loop()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_outbound_loop_writes_queued_frames_in_order() {
        let sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(8);
        tx.send(Frame::from("a")).await.unwrap();
        tx.send(Frame::from("b")).await.unwrap();
        drop(tx);

        outbound_loop(sink.clone(), rx, heartbeat(), ConnectionId::new(1))
            .await
            .unwrap();

        assert_eq!(
            sink.written(),
            vec![
                Written::Data(b"a".to_vec()),
                Written::Data(b"b".to_vec()),
                Written::Close,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_outbound_loop_pings_on_each_tick() {
        let sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(outbound_loop(sink.clone(), rx, heartbeat(), ConnectionId::new(1)));

        // Two full intervals and a bit: two pings.
        tokio::time::sleep(Duration::from_secs(11)).await;
        drop(tx);
        task.await.unwrap().unwrap();

        assert_eq!(sink.written(), vec![Written::Ping, Written::Ping, Written::Close]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outbound_loop_write_error_ends_loop() {
        let sink = RecordingSink {
            fail_sends: true,
            ..RecordingSink::default()
        };
        let (tx, rx) = mpsc::channel(8);
        tx.send(Frame::from("x")).await.unwrap();

        let result = outbound_loop(sink.clone(), rx, heartbeat(), ConnectionId::new(1)).await;

        assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
        assert!(sink.written().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_outbound_loop_stuck_write_times_out() {
        let (tx, rx) = mpsc::channel(8);
        tx.send(Frame::from("x")).await.unwrap();

        let result = outbound_loop(StuckSink, rx, heartbeat(), ConnectionId::new(1)).await;

        assert!(matches!(result, Err(TransportError::WriteTimeout(d)) if d == Duration::from_secs(1)));
    }

    // =====================================================================
    // ConnectionAdapter::run()
    // =====================================================================

    /// Registers an observer connection in session AB12 and returns its
    /// queue.
    async fn observe(hub: &HubHandle) -> mpsc::Receiver<Frame> {
        let (record, rx) = hub.connection(
            ConnectionId::next(),
            SessionCode::new("AB12"),
            ParticipantId::new("observer"),
        );
        hub.register(record).await.unwrap();
        rx
    }

    #[tokio::test]
    async fn test_run_relays_with_server_identity() {
        let hub = ConnectionHub::spawn(HubConfig::default());
        let mut observer = observe(&hub).await;

        let b = binding("real-id");
        let (record, queue) = hub.connection(b.connection, b.session.clone(), b.participant.clone());
        hub.register(record).await.unwrap();

        let (reads_tx, reads) = mpsc::channel(8);
        reads_tx
            .send(br#"{"type":"chat","participantId":"forged","sessionCode":"ZZZZ","payload":{"text":"hi"}}"#.to_vec())
            .await
            .unwrap();
        drop(reads_tx);

        let adapter = ConnectionAdapter::new(hub.clone(), JsonCodec, heartbeat());
        adapter
            .run(b, ScriptedSource { reads }, RecordingSink::default(), queue)
            .await;

        let relayed = json(&observer.recv().await.unwrap());
        assert_eq!(relayed["type"], "chat");
        assert_eq!(relayed["payload"]["text"], "hi");
        assert_eq!(relayed["participantId"], "real-id");
        assert_eq!(relayed["sessionCode"], "AB12");
        assert!(relayed["timestamp"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_run_skips_undecodable_frames() {
        let hub = ConnectionHub::spawn(HubConfig::default());
        let mut observer = observe(&hub).await;

        let b = binding("p-1");
        let (record, queue) = hub.connection(b.connection, b.session.clone(), b.participant.clone());
        hub.register(record).await.unwrap();

        let (reads_tx, reads) = mpsc::channel(8);
        reads_tx.send(b"garbage".to_vec()).await.unwrap();
        reads_tx.send(br#"{"payload":{}}"#.to_vec()).await.unwrap();
        reads_tx.send(br#"{"type":"  ","payload":{}}"#.to_vec()).await.unwrap();
        reads_tx.send(br#"{"type":"ok"}"#.to_vec()).await.unwrap();
        drop(reads_tx);

        let adapter = ConnectionAdapter::new(hub.clone(), JsonCodec, heartbeat());
        adapter
            .run(b, ScriptedSource { reads }, RecordingSink::default(), queue)
            .await;

        assert_eq!(json(&observer.recv().await.unwrap())["type"], "ok");
        assert_eq!(json(&observer.recv().await.unwrap())["type"], "player_left");
    }

    #[tokio::test]
    async fn test_run_on_close_unregisters_and_announces_departure() {
        let hub = ConnectionHub::spawn(HubConfig::default());
        let mut observer = observe(&hub).await;

        let b = binding("leaver");
        let (record, queue) = hub.connection(b.connection, b.session.clone(), b.participant.clone());
        assert_eq!(hub.register(record).await.unwrap(), 2);

        let (reads_tx, reads) = mpsc::channel(1);
        drop(reads_tx);
        let sink = RecordingSink::default();

        let adapter = ConnectionAdapter::new(hub.clone(), JsonCodec, heartbeat());
        adapter.run(b, ScriptedSource { reads }, sink.clone(), queue).await;

        let left = json(&observer.recv().await.unwrap());
        assert_eq!(left["type"], "player_left");
        assert_eq!(left["payload"]["participantId"], "leaver");
        assert_eq!(left["payload"]["playerCount"], 1);

        assert_eq!(hub.connection_count(&SessionCode::new("AB12")).await.unwrap(), 1);
        assert_eq!(sink.written().last(), Some(&Written::Close));
    }
    #[tokio::test]
    async fn test_run_with_hub_gone_still_finishes_departure() {
        let hub = ConnectionHub::spawn(HubConfig::default());
        let b = binding("p-1");
        let (record, queue) = hub.connection(b.connection, b.session.clone(), b.participant.clone());
        hub.register(record).await.unwrap();
        hub.shutdown().await.unwrap();

        let (reads_tx, reads) = mpsc::channel(1);
        reads_tx.send(br#"{"type":"chat"}"#.to_vec()).await.unwrap();
        drop(reads_tx);
        let sink = RecordingSink::default();

        let adapter = ConnectionAdapter::new(hub.clone(), JsonCodec, heartbeat());
        adapter.run(b, ScriptedSource { reads }, sink.clone(), queue).await;

        assert_eq!(sink.written(), vec![Written::Close]);
    }
}
