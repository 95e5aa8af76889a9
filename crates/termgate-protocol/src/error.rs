//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a server frame failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The client's bytes are not a well-formed JSON client frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The client's bytes decoded but are not acceptable input, e.g. a
    /// raw line that is not valid UTF-8.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
