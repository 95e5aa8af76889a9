//! Durable storage for Termgate: user credentials, login history and the
//! message base.
//!
//! The [`CredentialStore`] trait is what sessions program against; the
//! shipped implementation is [`SqliteStore`]. The trait is synchronous:
//! async callers run it on a blocking thread with a timeout around it.
//!
//! Invariants every implementation keeps:
//!
//! - Username identity is case-insensitive, and uniqueness is enforced by
//!   the table constraint. A constraint violation is the only duplicate
//!   signal, so two racing registrations produce exactly one user.
//! - Password hash and salt never leave the store. [`User`] has no field
//!   for them.
//! - Every query binds its parameters.

mod error;
mod password;
mod sqlite;

pub use error::StoreError;
pub use sqlite::{SqliteStore, StoreConfig};

use std::fmt;
use std::net::IpAddr;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A registered user, as seen outside the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// The name as first registered (original case).
    pub username: String,
    pub real_name: Option<String>,
    pub location: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds of the last successful login, if any.
    pub last_login_at: Option<i64>,
    pub login_count: u32,
}

/// Optional profile fields collected at registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub real_name: Option<String>,
    pub location: Option<String>,
}

/// The result of one login attempt, as written to the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Success,
    Failure,
    /// The failure that tripped (or hit) an origin lockout.
    Lockout,
}

impl LoginOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Lockout => "lockout",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "lockout" => Some(Self::Lockout),
            _ => None,
        }
    }
}

impl fmt::Display for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the append-only login history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub origin: String,
    pub username: String,
    pub timestamp: i64,
    pub outcome: LoginOutcome,
}

/// A stored message-base post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub area: String,
    pub from_user: String,
    pub to_user: String,
    pub subject: String,
    pub body: String,
    /// Unix seconds.
    pub posted_at: i64,
}

/// A post about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage<'a> {
    pub area: &'a str,
    pub from_user: &'a str,
    pub to_user: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Operations the session core needs from persistent storage.
///
/// `Send + Sync + 'static` so one store can sit behind an `Arc` shared by
/// every connection task.
pub trait CredentialStore: Send + Sync + 'static {
    /// Registers a user, hashing `password` with a fresh salt.
    ///
    /// # Errors
    /// `DuplicateUsername` if the name exists in any letter case.
    fn create_user(
        &self,
        username: &str,
        password: &str,
        profile: &Profile,
    ) -> Result<User, StoreError>;

    /// Removes a user, case-insensitively.
    ///
    /// Only used to undo a registration the caller stopped waiting for, so
    /// the name is free again.
    ///
    /// # Errors
    /// `NotFound` if no such user exists.
    fn delete_user(&self, username: &str) -> Result<(), StoreError>;

    /// Looks a user up by name, case-insensitively.
    fn find_user(&self, username: &str) -> Result<User, StoreError>;

    /// Re-derives the hash for `password` with the user's stored salt and
    /// iteration count and compares in constant time.
    fn verify_password(&self, user: &User, password: &str) -> Result<bool, StoreError>;

    /// Appends one row to the login history.
    fn record_login_attempt(
        &self,
        origin: IpAddr,
        username: &str,
        outcome: LoginOutcome,
    ) -> Result<(), StoreError>;

    /// Stamps `last_login_at`, bumps `login_count` and returns the updated
    /// record.
    fn record_successful_login(&self, user: &User) -> Result<User, StoreError>;

    /// The most recent login history rows, newest first.
    fn login_history(&self, limit: usize) -> Result<Vec<LoginAttempt>, StoreError>;

    /// Up to `limit` users, most recently active first.
    fn list_users(&self, limit: usize) -> Result<Vec<User>, StoreError>;

    /// Stores a post and returns its id.
    fn post_message(&self, message: &NewMessage<'_>) -> Result<i64, StoreError>;

    /// Up to `limit` posts in `area`, newest first.
    fn list_messages(&self, area: &str, limit: usize) -> Result<Vec<Message>, StoreError>;

    /// One post by id, only if it belongs to `area`.
    fn read_message(&self, area: &str, id: i64) -> Result<Message, StoreError>;
}
