/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The connection-level handshake (e.g. the WebSocket upgrade) failed.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// The peer sent a frame longer than the transport accepts.
    ///
    /// The oversized frame has been discarded up to its delimiter, so the
    /// connection is still usable.
    #[error("frame exceeds {max} bytes")]
    FrameTooLong { max: usize },
}

impl TransportError {
    /// Returns `true` if the connection can keep being used after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FrameTooLong { .. })
    }
}
