//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Accepting is two-step so a slow handshake never stalls the listener:
//! [`WebSocketTransport::accept`] only takes the TCP stream, and the
//! caller runs [`PendingUpgrade::upgrade`] on its own task.

use std::io;
use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::error::CapacityError;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;

use crate::{
    ConnectParams, ConnectionId, FrameSink, FrameSource, ReadLimits, Rejection,
    TransportError,
};

type WsStream = WebSocketStream<TcpStream>;

/// Listens for incoming TCP connections destined for a WebSocket upgrade.
pub struct WebSocketTransport {
    listener: TcpListener,
    limits: ReadLimits,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address, with default
    /// [`ReadLimits`].
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener =
            TcpListener::bind(addr).await.map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            limits: ReadLimits::default(),
        })
    }

    /// Sets the read limits for every connection accepted from now on.
    ///
    /// The size cap is handed to the WebSocket protocol layer, so an
    /// oversized frame fails on its header instead of after buffering.
    pub fn with_read_limits(mut self, limits: ReadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn read_limits(&self) -> ReadLimits {
        self.limits
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next TCP connection. The upgrade itself happens in
    /// [`PendingUpgrade::upgrade`].
    pub async fn accept(&self) -> Result<PendingUpgrade, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::debug!(%addr, "accepted TCP connection");
        Ok(PendingUpgrade {
            stream,
            addr,
            limits: self.limits,
        })
    }
}

/// A TCP stream that has not yet completed its WebSocket handshake.
pub struct PendingUpgrade {
    stream: TcpStream,
    addr: SocketAddr,
    limits: ReadLimits,
}

impl PendingUpgrade {
    /// The remote address of the pending connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Completes the handshake if the request carries valid
    /// [`ConnectParams`] and `gate` accepts them.
    ///
    /// Malformed requests and gate rejections are answered with a plain HTTP
    /// error response; the stream is never upgraded in that case.
    pub async fn upgrade<G>(
        self,
        gate: G,
    ) -> Result<WebSocketConnection, TransportError>
    where
        G: FnOnce(&ConnectParams) -> Result<(), Rejection> + Send + Unpin,
    {
        let mut accepted: Option<ConnectParams> = None;
        let mut refused: Option<Rejection> = None;

        let callback = |request: &Request,
                        response: Response|
         -> Result<Response, ErrorResponse> {
            let uri = request.uri();
            let outcome = ConnectParams::parse(uri.path(), uri.query())
                .and_then(|params| gate(&params).map(|()| params));
            match outcome {
                Ok(params) => {
                    accepted = Some(params);
                    Ok(response)
                }
                Err(rejection) => {
                    let response = error_response(&rejection);
                    refused = Some(rejection);
                    Err(response)
                }
            }
        };

        let result = tokio_tungstenite::accept_hdr_async_with_config(
            self.stream,
            callback,
            Some(protocol_config(self.limits)),
        )
        .await;

        let ws = match result {
            Ok(ws) => ws,
            Err(e) => {
                if let Some(rejection) = refused {
                    tracing::debug!(
                        addr = %self.addr,
                        %rejection,
                        "upgrade rejected"
                    );
                    return Err(TransportError::Rejected {
                        status: rejection.status,
                        reason: rejection.reason,
                    });
                }
                return Err(TransportError::AcceptFailed(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    e,
                )));
            }
        };

        let params = accepted.ok_or_else(|| {
            TransportError::ConnectionClosed(
                "handshake completed without connection parameters".into(),
            )
        })?;

        let id = ConnectionId::next();
        tracing::debug!(
            %id,
            addr = %self.addr,
            session = %params.session_code,
            participant = %params.participant_id,
            "upgraded WebSocket connection"
        );

        Ok(WebSocketConnection {
            id,
            params,
            addr: self.addr,
            limits: self.limits,
            ws,
        })
    }
}

/// Protocol-level caps matching `limits`. A single frame may never be
/// larger than the whole message.
fn protocol_config(limits: ReadLimits) -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(limits.max_message_size))
        .max_frame_size(Some(limits.max_message_size))
}

/// Builds the HTTP response returned for a refused upgrade.
fn error_response(rejection: &Rejection) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(rejection.reason.clone()));
    *response.status_mut() =
        StatusCode::from_u16(rejection.status).unwrap_or(StatusCode::BAD_REQUEST);
    response
}

/// An upgraded WebSocket connection, not yet split into halves.
pub struct WebSocketConnection {
    id: ConnectionId,
    params: ConnectParams,
    addr: SocketAddr,
    limits: ReadLimits,
    ws: WsStream,
}

impl WebSocketConnection {
    /// Returns the unique identifier for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The session and participant this connection was opened for.
    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    /// The remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Splits the connection into independently owned read and write halves.
    ///
    /// The read half keeps the limits the connection was accepted with.
    pub fn split(self) -> (WebSocketSource, WebSocketSink) {
        let (sink, stream) = self.ws.split();
        (
            WebSocketSource {
                stream,
                limits: self.limits,
            },
            WebSocketSink { sink },
        )
    }
}

/// The read half of a WebSocket connection.
pub struct WebSocketSource {
    stream: SplitStream<WsStream>,
    limits: ReadLimits,
}

impl FrameSource for WebSocketSource {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            let next =
                tokio::time::timeout(self.limits.idle_timeout, self.stream.next())
                    .await
                    .map_err(|_| {
                        TransportError::IdleTimeout(self.limits.idle_timeout)
                    })?;

            return match next {
                Some(Ok(Message::Binary(data))) => Ok(Some(data.into())),
                Some(Ok(Message::Text(text))) => Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Close(_))) | None => Ok(None),
                // Ping/pong/raw frames: the read window restarts.
                Some(Ok(_)) => continue,
                Some(Err(tungstenite::Error::Capacity(CapacityError::MessageTooLong {
                    size,
                    max_size,
                }))) => Err(TransportError::MessageTooLarge {
                    size,
                    limit: max_size,
                }),
                Some(Err(e)) => Err(TransportError::ReceiveFailed(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    e,
                ))),
            };
        }
    }
}

/// The write half of a WebSocket connection.
pub struct WebSocketSink {
    sink: SplitSink<WsStream, Message>,
}

impl WebSocketSink {
    async fn write(&mut self, msg: Message) -> Result<(), TransportError> {
        self.sink.send(msg).await.map_err(|e| {
            TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, e))
        })
    }
}

impl FrameSink for WebSocketSink {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        // JSON frames go out as text; anything else as binary.
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::text(text.to_owned()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.write(msg).await
    }

    async fn ping(&mut self) -> Result<(), TransportError> {
        self.write(Message::Ping(Vec::new().into())).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.write(Message::Close(None)).await
    }
}
