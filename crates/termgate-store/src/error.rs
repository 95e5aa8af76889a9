//! Error types for the credential store.

/// Errors returned by a [`CredentialStore`](crate::CredentialStore).
///
/// Only `DuplicateUsername` and `NotFound` are meant for the peer. Every
/// other variant carries backend detail that belongs in the log; the
/// session shows a generic "try again later" instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The username is already registered (case-insensitively).
    #[error("username is already taken")]
    DuplicateUsername,

    /// No such user or message.
    #[error("not found")]
    NotFound,

    /// The operation did not finish within the configured bound.
    #[error("store operation timed out")]
    Timeout,

    /// The store could not run the operation at all (e.g. its worker
    /// thread died).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored record failed to decode.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Any other SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl StoreError {
    /// Returns `true` for errors the peer may be told about directly.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::DuplicateUsername | Self::NotFound)
    }
}
