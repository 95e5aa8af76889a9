//! Unified error type for the Termgate server.

use termgate_protocol::ProtocolError;
use termgate_session::SessionError;
use termgate_store::StoreError;
use termgate_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors, so server
/// code and binaries deal with this one type.
#[derive(Debug, thiserror::Error)]
pub enum TermgateError {
    /// Listener or connection failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Opening or using the credential store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The configuration was unreadable or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let termgate_err: TermgateError = err.into();
        assert!(matches!(termgate_err, TermgateError::Transport(_)));
        assert!(termgate_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let termgate_err: TermgateError = err.into();
        assert!(matches!(termgate_err, TermgateError::Protocol(_)));
    }

    #[test]
    fn test_from_store_error() {
        let termgate_err: TermgateError = StoreError::DuplicateUsername.into();
        assert!(matches!(termgate_err, TermgateError::Store(_)));
    }

    #[test]
    fn test_from_config_error() {
        let err = ConfigError::Invalid("zero window".into());
        let termgate_err: TermgateError = err.into();
        assert!(termgate_err.to_string().contains("zero window"));
    }
}
