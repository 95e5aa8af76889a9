//! Error types for the session layer.

use std::time::Duration;

use termgate_door::DoorError;
use termgate_guard::RateLimitError;
use termgate_store::StoreError;

/// Errors that end an operation inside a session.
///
/// None of these reach the peer verbatim. The session logs the detail and
/// shows a generic line instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The credential store returned an error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A store call did not finish within the configured bound.
    #[error("store call timed out after {0:?}")]
    StoreTimeout(Duration),

    /// The requested door could not be launched.
    #[error("door error: {0}")]
    Door(#[from] DoorError),

    /// The origin is refused by the rate limiter.
    #[error("rate limited: {0}")]
    RateLimited(#[from] RateLimitError),
}

impl SessionError {
    /// The line shown to the peer for this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited(RateLimitError::LockedOut { .. }) => {
                "Too many failed logins from your address. Try again later."
            }
            Self::RateLimited(RateLimitError::Throttled { .. }) => {
                "Rate limit exceeded. Please slow down."
            }
            Self::Door(_) => "That door is not available right now.",
            _ => "The system is busy. Please try again later.",
        }
    }

    /// Returns `false` for store outcomes that describe the request rather
    /// than a fault in the backend.
    pub fn is_backend_fault(&self) -> bool {
        match self {
            Self::Store(err) => !err.is_user_facing(),
            Self::StoreTimeout(_) => true,
            Self::Door(_) | Self::RateLimited(_) => false,
        }
    }
}

/// Why a password check did not log the user in.
///
/// The `Display` text is what the peer sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationError {
    /// Wrong password, more tries left on this connection.
    #[error("Invalid login. {attempts_left} attempt(s) left.")]
    WrongPassword { attempts_left: u32 },

    /// Wrong password and the per-connection retry cap is used up.
    #[error("Too many failed attempts. Goodbye.")]
    RetriesExhausted,

    /// This failure locked the origin out.
    #[error("Too many failed logins from your address. Try again in {}s.", .remaining.as_secs().max(1))]
    LockedOut { remaining: Duration },
}

impl AuthenticationError {
    /// Returns `true` if the connection must end.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::WrongPassword { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_store_detail() {
        let err = SessionError::Store(StoreError::Unavailable("disk on fire".into()));
        assert!(!err.user_message().contains("disk"));
    }

    #[test]
    fn test_is_backend_fault_splits_store_errors() {
        assert!(SessionError::Store(StoreError::Timeout).is_backend_fault());
        assert!(SessionError::StoreTimeout(Duration::from_secs(5)).is_backend_fault());
        assert!(!SessionError::Store(StoreError::NotFound).is_backend_fault());
        assert!(!SessionError::Store(StoreError::DuplicateUsername).is_backend_fault());
    }

    #[test]
    fn test_authentication_error_terminal_variants() {
        assert!(!AuthenticationError::WrongPassword { attempts_left: 2 }.is_terminal());
        assert!(AuthenticationError::RetriesExhausted.is_terminal());
        assert!(
            AuthenticationError::LockedOut {
                remaining: Duration::from_secs(300)
            }
            .is_terminal()
        );
    }

    #[test]
    fn test_wrong_password_display_counts_down() {
        let err = AuthenticationError::WrongPassword { attempts_left: 1 };
        assert_eq!(err.to_string(), "Invalid login. 1 attempt(s) left.");
    }
}
