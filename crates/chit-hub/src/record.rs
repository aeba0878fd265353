//! A registered connection as the hub sees it.

use chit_protocol::{Frame, ParticipantId, SessionCode};
use chit_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// One connection's identity plus the sending half of its outbound queue.
///
/// The hub owns the record while it is registered. Dropping it drops the
/// only sender, which closes the queue and tells the connection's outbound
/// loop to send a close frame and stop.
#[derive(Debug)]
pub struct ConnectionRecord {
    id: ConnectionId,
    session: SessionCode,
    participant: ParticipantId,
    queue: mpsc::Sender<Frame>,
}

impl ConnectionRecord {
    /// Creates a record and the receiving half of its bounded queue.
    pub fn new(
        id: ConnectionId,
        session: SessionCode,
        participant: ParticipantId,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Frame>) {
        let (queue, rx) = mpsc::channel(capacity.max(1));
        let record = Self {
            id,
            session,
            participant,
            queue,
        };
        (record, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn session(&self) -> &SessionCode {
        &self.session
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    /// Queues a frame without waiting.
    ///
    /// Used by the hub for fan-out, and by the connection handler for the
    /// private greeting before the record is handed over.
    pub fn enqueue(&self, frame: Frame) -> Result<(), TrySendError<Frame>> {
        self.queue.try_send(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(capacity: usize) -> (ConnectionRecord, mpsc::Receiver<Frame>) {
        ConnectionRecord::new(
            ConnectionId::new(1),
            SessionCode::new("AB12"),
            ParticipantId::new("p-1"),
            capacity,
        )
    }

    #[test]
    fn test_enqueue_full_queue_returns_full() {
        let (record, _rx) = record(1);
        record.enqueue(Frame::from("one")).unwrap();

        let result = record.enqueue(Frame::from("two"));
        assert!(matches!(result, Err(TrySendError::Full(_))));
    }

    #[test]
    fn test_enqueue_dropped_receiver_returns_closed() {
        let (record, rx) = record(4);
        drop(rx);

        let result = record.enqueue(Frame::from("one"));
        assert!(matches!(result, Err(TrySendError::Closed(_))));
    }

    #[tokio::test]
    async fn test_drop_record_closes_queue() {
        let (record, mut rx) = record(4);
        record.enqueue(Frame::from("last")).unwrap();
        drop(record);

        assert_eq!(rx.recv().await.unwrap().as_bytes(), b"last");
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_new_zero_capacity_is_raised_to_one() {
        let (record, _rx) = record(0);
        assert!(record.enqueue(Frame::from("fits")).is_ok());
    }
}
