//! Integration tests for the WebSocket transport.
//!
//! These tests spin up a real listener on an OS-assigned port and connect a
//! `tokio-tungstenite` client to it, so the upgrade gate, the split halves
//! and the read limits are exercised over an actual socket.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use chit_transport::{
        FrameSink, FrameSource, ReadLimits, Rejection, TransportError,
        WebSocketConnection, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::{self, Message};

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn bind() -> (WebSocketTransport, String) {
        bind_with(ReadLimits::default()).await
    }

    async fn bind_with(limits: ReadLimits) -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind")
            .with_read_limits(limits);
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    /// Accepts one connection on a background task, letting everything
    /// through the gate.
    fn accept_one(
        transport: WebSocketTransport,
    ) -> tokio::task::JoinHandle<Result<WebSocketConnection, TransportError>> {
        tokio::spawn(async move {
            let pending = transport.accept().await?;
            pending.upgrade(|_| Ok(())).await
        })
    }

    async fn connect(addr: &str, path: &str) -> Result<ClientWs, tungstenite::Error> {
        tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
            .await
            .map(|(ws, _)| ws)
    }

    #[tokio::test]
    async fn test_upgrade_exposes_connect_params() {
        let (transport, addr) = bind().await;
        let server = accept_one(transport);

        let _client = connect(&addr, "/ws/AB12?playerId=p-1").await.unwrap();
        let conn = server.await.unwrap().expect("upgrade should succeed");

        assert_eq!(conn.params().session_code, "AB12");
        assert_eq!(conn.params().participant_id, "p-1");
        assert!(conn.id().into_inner() > 0);
    }

    #[tokio::test]
    async fn test_upgrade_without_player_id_is_rejected_before_stream() {
        let (transport, addr) = bind().await;
        let server = accept_one(transport);

        let result = connect(&addr, "/ws/AB12").await;

        match result {
            Err(tungstenite::Error::Http(response)) => {
                assert_eq!(response.status(), 400);
            }
            Err(e) => panic!("expected HTTP 400, got {e}"),
            Ok(_) => panic!("upgrade should have been refused"),
        }
        let server_result = server.await.unwrap();
        assert!(matches!(
            server_result,
            Err(TransportError::Rejected { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_upgrade_gate_rejection_uses_gate_status() {
        let (transport, addr) = bind().await;
        let server = tokio::spawn(async move {
            let pending = transport.accept().await?;
            pending
                .upgrade(|params| {
                    if params.session_code == "NOPE" {
                        Err(Rejection::not_found("Room not found"))
                    } else {
                        Ok(())
                    }
                })
                .await
        });

        let result = connect(&addr, "/ws/NOPE?playerId=p-1").await;

        match result {
            Err(tungstenite::Error::Http(response)) => {
                assert_eq!(response.status(), 404);
            }
            Err(e) => panic!("expected HTTP 404, got {e}"),
            Ok(_) => panic!("upgrade should have been refused"),
        }
        assert!(matches!(
            server.await.unwrap(),
            Err(TransportError::Rejected { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_split_halves_send_and_receive() {
        let (transport, addr) = bind().await;
        let server = accept_one(transport);
        let mut client = connect(&addr, "/ws/AB12?playerId=p-1").await.unwrap();
        let conn = server.await.unwrap().unwrap();
        let (mut source, mut sink) = conn.split();

        // --- Server sends JSON, client receives a text frame ---
        sink.send(br#"{"type":"hello"}"#).await.expect("send");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_data().as_ref(), br#"{"type":"hello"}"#);

        // --- Client sends, server receives ---
        client
            .send(Message::text("from client".to_string()))
            .await
            .unwrap();
        let received = source.recv().await.expect("recv").expect("data");
        assert_eq!(received, b"from client");

        // --- Close frame reaches the client ---
        sink.close().await.expect("close");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_close());
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_client_close() {
        let (transport, addr) = bind().await;
        let server = accept_one(transport);
        let mut client = connect(&addr, "/ws/AB12?playerId=p-1").await.unwrap();
        let conn = server.await.unwrap().unwrap();
        let (mut source, _sink) = conn.split();

        client.send(Message::Close(None)).await.unwrap();

        let result = source.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_recv_rejects_oversized_message() {
        let (transport, addr) = bind_with(ReadLimits {
            max_message_size: 8,
            ..ReadLimits::default()
        })
        .await;
        let server = accept_one(transport);
        let mut client = connect(&addr, "/ws/AB12?playerId=p-1").await.unwrap();
        let conn = server.await.unwrap().unwrap();
        let (mut source, _sink) = conn.split();

        client
            .send(Message::Binary(vec![0u8; 32].into()))
            .await
            .unwrap();

        let result = source.recv().await;
        assert!(matches!(
            result,
            Err(TransportError::MessageTooLarge { size: 32, limit: 8 })
        ));
    }

    #[tokio::test]
    async fn test_recv_refuses_large_frame_from_its_header() {
        let (transport, addr) = bind_with(ReadLimits {
            max_message_size: 512,
            ..ReadLimits::default()
        })
        .await;
        let server = accept_one(transport);
        let mut client = connect(&addr, "/ws/AB12?playerId=p-1").await.unwrap();
        let conn = server.await.unwrap().unwrap();
        let (mut source, _sink) = conn.split();

        // Far past the cap: only the frame header needs reading to refuse it.
        let sent = tokio::spawn(async move {
            let _ = client.send(Message::Binary(vec![0u8; 4 * 1024 * 1024].into())).await;
            client
        });

        let result = source.recv().await;
        assert!(matches!(
            result,
            Err(TransportError::MessageTooLarge { size: 4_194_304, limit: 512 })
        ));
        drop(sent);
    }

    #[tokio::test]
    async fn test_recv_times_out_when_peer_is_silent() {
        let (transport, addr) = bind_with(ReadLimits {
            idle_timeout: Duration::from_millis(50),
            ..ReadLimits::default()
        })
        .await;
        let server = accept_one(transport);
        let _client = connect(&addr, "/ws/AB12?playerId=p-1").await.unwrap();
        let conn = server.await.unwrap().unwrap();
        let (mut source, _sink) = conn.split();

        let result = source.recv().await;
        assert!(matches!(result, Err(TransportError::IdleTimeout(_))));
    }
}
