//! Error types for input screening.
//!
//! Both enums are ordinary control flow for a session: the session turns
//! them into a user-visible line and re-prompts. Their `Display` text is
//! safe to show to the peer.

use std::time::Duration;

use crate::{BlacklistRule, FieldKind};

/// Why the validator rejected an input line.
///
/// The same input always yields the same variant, so the peer sees a
/// stable reason for a given mistake.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The raw line is longer than the field allows.
    #[error("{field} is too long (max {max} characters)")]
    TooLong { field: FieldKind, max: usize },

    /// After stripping, the value is shorter than the field requires.
    #[error("{field} is too short (min {min} characters)")]
    TooShort { field: FieldKind, min: usize },

    /// The value matched a blacklist signature.
    ///
    /// `rule` is for the log; the message does not name it.
    #[error("{field} contains forbidden content")]
    Blacklisted { field: FieldKind, rule: BlacklistRule },

    /// A structured field contains characters outside its charset.
    #[error("{field} may only contain {allowed}")]
    Charset {
        field: FieldKind,
        allowed: &'static str,
    },

    /// Usernames must begin with an ASCII letter.
    #[error("username must start with a letter")]
    MustStartWithLetter,

    /// The username is one of the reserved system names.
    #[error("that username is reserved")]
    ReservedName,

    /// A new password does not meet the strength rules.
    #[error(
        "password must be at least {min} characters with upper case, lower case, a digit and a symbol"
    )]
    WeakPassword { min: usize },
}

/// Why the rate limiter refused an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// The command track is full; the line is dropped without effect.
    #[error("too many commands, slow down (retry in {}s)", .retry_after.as_secs().max(1))]
    Throttled { retry_after: Duration },

    /// The origin is locked out after too many failed logins.
    #[error("too many failed logins, try again in {}s", .remaining.as_secs().max(1))]
    LockedOut { remaining: Duration },
}

impl RateLimitError {
    /// Returns `true` if the connection must end because of this error.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::LockedOut { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_names_field() {
        let err = ValidationError::TooLong {
            field: FieldKind::Username,
            max: 20,
        };
        assert_eq!(err.to_string(), "username is too long (max 20 characters)");
    }

    #[test]
    fn test_blacklisted_display_hides_rule() {
        let err = ValidationError::Blacklisted {
            field: FieldKind::Text,
            rule: BlacklistRule::QueryInjection,
        };
        assert_eq!(err.to_string(), "text contains forbidden content");
    }

    #[test]
    fn test_rate_limit_error_lockout_is_terminal() {
        let lockout = RateLimitError::LockedOut {
            remaining: Duration::from_secs(300),
        };
        let throttle = RateLimitError::Throttled {
            retry_after: Duration::from_millis(200),
        };
        assert!(lockout.is_terminal());
        assert!(!throttle.is_terminal());
        assert_eq!(throttle.to_string(), "too many commands, slow down (retry in 1s)");
    }
}
