//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Browser terminals attach here. Every WebSocket message is one frame: an
//! inbound text (or binary) message is one line of client input, and each
//! outbound frame is sent as a single text message.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;

use crate::{
    Connection, ConnectionId, DEFAULT_MAX_FRAME_LEN, Incoming, Transport,
    TransportError,
};

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    max_frame_len: usize,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::bind_with_limit(addr, DEFAULT_MAX_FRAME_LEN).await
    }

    /// Binds to `addr`, accepting client messages of at most
    /// `max_frame_len` bytes.
    pub async fn bind_with_limit(
        addr: &str,
        max_frame_len: usize,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            max_frame_len,
        })
    }
}

impl Transport for WebSocketTransport {
    type Incoming = WebSocketIncoming;
    type Connection = WebSocketConnection;

    async fn accept(&mut self) -> Result<WebSocketIncoming, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(WebSocketIncoming {
            stream,
            peer,
            max_frame_len: self.max_frame_len,
        })
    }

    fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)
    }
}

/// A TCP peer whose WebSocket upgrade has not happened yet.
pub struct WebSocketIncoming {
    stream: TcpStream,
    peer: SocketAddr,
    max_frame_len: usize,
}

impl Incoming for WebSocketIncoming {
    type Connection = WebSocketConnection;

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn establish(self) -> Result<WebSocketConnection, TransportError> {
        let ws = tokio_tungstenite::accept_async(self.stream)
            .await
            .map_err(|e| TransportError::HandshakeFailed(e.to_string()))?;

        let id = ConnectionId::next();
        tracing::debug!(%id, peer = %self.peer, "accepted WebSocket connection");

        Ok(WebSocketConnection {
            id,
            peer: self.peer,
            max_frame_len: self.max_frame_len,
            ws: Mutex::new(ws),
        })
    }

    async fn refuse(self, notice: &[u8]) {
        // Without a completed upgrade there is no channel to carry a notice
        // to a browser; a busy notice needs the handshake first.
        if notice.is_empty() {
            return;
        }
        let Ok(mut ws) = tokio_tungstenite::accept_async(self.stream).await
        else {
            return;
        };
        let text = String::from_utf8_lossy(notice).into_owned();
        let _ = ws.send(Message::Text(text.into())).await;
        let _ = ws.close(None).await;
    }
}

/// A single WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    max_frame_len: usize,
    ws: Mutex<WsStream>,
}

fn to_send_error(e: tokio_tungstenite::tungstenite::Error) -> TransportError {
    TransportError::SendFailed(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        e,
    ))
}

impl Connection for WebSocketConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let text = String::from_utf8_lossy(data).into_owned();
        self.ws
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(to_send_error)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            let msg = self.ws.lock().await.next().await;
            let payload = match msg {
                Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                Some(Ok(Message::Binary(data))) => data.to_vec(),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            };

            if payload.len() > self.max_frame_len {
                return Err(TransportError::FrameTooLong {
                    max: self.max_frame_len,
                });
            }
            return Ok(Some(payload));
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.ws.lock().await.close(None).await.map_err(to_send_error)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
