//! SQLite-backed [`CredentialStore`].
//!
//! Tables:
//! - `users`: username (PK, NOCASE), password_hash, salt, iterations,
//!   real_name, location, created_at, last_login_at, login_count
//! - `login_attempts`: id, origin, username, timestamp, outcome
//! - `messages`: id, area, from_user, to_user, subject, body, posted_at

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use crate::password::{constant_time_eq, generate_salt, hash_password};
use crate::{
    CredentialStore, LoginAttempt, LoginOutcome, Message, NewMessage, Profile,
    StoreError, User,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        username TEXT PRIMARY KEY COLLATE NOCASE,
        password_hash TEXT NOT NULL,
        salt TEXT NOT NULL,
        iterations INTEGER NOT NULL,
        real_name TEXT,
        location TEXT,
        created_at INTEGER NOT NULL,
        last_login_at INTEGER,
        login_count INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS login_attempts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        origin TEXT NOT NULL,
        username TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        outcome TEXT NOT NULL CHECK (outcome IN ('success', 'failure', 'lockout'))
    );
    CREATE INDEX IF NOT EXISTS idx_login_attempts_origin
        ON login_attempts(origin, timestamp);

    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        area TEXT NOT NULL,
        from_user TEXT NOT NULL,
        to_user TEXT NOT NULL DEFAULT 'All',
        subject TEXT NOT NULL,
        body TEXT NOT NULL,
        posted_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_area ON messages(area, id);
";

/// Configuration for [`SqliteStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database file. Created if missing.
    pub path: PathBuf,
    /// PBKDF2 iterations for newly created passwords.
    pub hash_iterations: u32,
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("termgate.db"),
            hash_iterations: 100_000,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// SQLite-backed credential store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    hash_iterations: u32,
}

impl SqliteStore {
    /// Opens (or creates) the database at `config.path`.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(&config.path)?;

        // WAL so readers don't block the writer.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        let store = Self::init(conn, config.hash_iterations, config.busy_timeout)?;
        tracing::info!(path = %config.path.display(), "credential store opened");
        Ok(store)
    }

    /// Opens a private in-memory database. Used by tests and demos.
    pub fn open_in_memory(hash_iterations: u32) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, hash_iterations, Duration::from_secs(5))
    }

    fn init(
        conn: Connection,
        hash_iterations: u32,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            hash_iterations,
        })
    }
}

impl CredentialStore for SqliteStore {
    fn create_user(
        &self,
        username: &str,
        password: &str,
        profile: &Profile,
    ) -> Result<User, StoreError> {
        // Hash before taking the lock; this is the slow part.
        let salt = generate_salt();
        let password_hash = hash_password(password, &salt, self.hash_iterations);
        let now = epoch_secs();

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO users
                (username, password_hash, salt, iterations, real_name, location, created_at, login_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
            params![
                username,
                password_hash,
                hex::encode(salt),
                self.hash_iterations,
                profile.real_name,
                profile.location,
                now,
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::DuplicateUsername);
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(username, "user registered");
        Ok(User {
            username: username.to_string(),
            real_name: profile.real_name.clone(),
            location: profile.location.clone(),
            created_at: now,
            last_login_at: None,
            login_count: 0,
        })
    }

    fn delete_user(&self, username: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM users WHERE username = ?1", params![username])?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::warn!(username, "user removed");
        Ok(())
    }

    fn find_user(&self, username: &str) -> Result<User, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT username, real_name, location, created_at, last_login_at, login_count
             FROM users WHERE username = ?1",
            params![username],
            user_from_row,
        )
        .optional()?
        .ok_or(StoreError::NotFound)
    }

    fn verify_password(&self, user: &User, password: &str) -> Result<bool, StoreError> {
        let (stored_hash, salt_hex, iterations) = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT password_hash, salt, iterations FROM users WHERE username = ?1",
                params![user.username],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound)?
        };

        let salt = hex::decode(&salt_hex)
            .map_err(|e| StoreError::Corrupt(format!("salt for {}: {e}", user.username)))?;
        let iterations = u32::try_from(iterations).map_err(|_| {
            StoreError::Corrupt(format!("iteration count for {}", user.username))
        })?;

        let attempt = hash_password(password, &salt, iterations);
        Ok(constant_time_eq(stored_hash.as_bytes(), attempt.as_bytes()))
    }

    fn record_login_attempt(
        &self,
        origin: IpAddr,
        username: &str,
        outcome: LoginOutcome,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO login_attempts (origin, username, timestamp, outcome)
             VALUES (?1, ?2, ?3, ?4)",
            params![origin.to_string(), username, epoch_secs(), outcome.as_str()],
        )?;
        Ok(())
    }

    fn record_successful_login(&self, user: &User) -> Result<User, StoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE users SET last_login_at = ?1, login_count = login_count + 1
             WHERE username = ?2",
            params![epoch_secs(), user.username],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        conn.query_row(
            "SELECT username, real_name, location, created_at, last_login_at, login_count
             FROM users WHERE username = ?1",
            params![user.username],
            user_from_row,
        )
        .map_err(StoreError::from)
    }

    fn login_history(&self, limit: usize) -> Result<Vec<LoginAttempt>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT origin, username, timestamp, outcome FROM login_attempts
             ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit_param(limit)], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut attempts = Vec::new();
        for row in rows {
            let (origin, username, timestamp, outcome) = row?;
            let outcome = LoginOutcome::parse(&outcome)
                .ok_or_else(|| StoreError::Corrupt(format!("login outcome {outcome:?}")))?;
            attempts.push(LoginAttempt {
                origin,
                username,
                timestamp,
                outcome,
            });
        }
        Ok(attempts)
    }

    fn list_users(&self, limit: usize) -> Result<Vec<User>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT username, real_name, location, created_at, last_login_at, login_count
             FROM users
             ORDER BY COALESCE(last_login_at, created_at) DESC, username
             LIMIT ?1",
        )?;
        let users = stmt
            .query_map(params![limit_param(limit)], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn post_message(&self, message: &NewMessage<'_>) -> Result<i64, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (area, from_user, to_user, subject, body, posted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.area,
                message.from_user,
                message.to_user,
                message.subject,
                message.body,
                epoch_secs(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!(id, area = message.area, from = message.from_user, "message posted");
        Ok(id)
    }

    fn list_messages(&self, area: &str, limit: usize) -> Result<Vec<Message>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, area, from_user, to_user, subject, body, posted_at
             FROM messages WHERE area = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let messages = stmt
            .query_map(params![area, limit_param(limit)], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    fn read_message(&self, area: &str, id: i64) -> Result<Message, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, area, from_user, to_user, subject, body, posted_at
             FROM messages WHERE id = ?1 AND area = ?2",
            params![id, area],
            message_from_row,
        )
        .optional()?
        .ok_or(StoreError::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        username: row.get(0)?,
        real_name: row.get(1)?,
        location: row.get(2)?,
        created_at: row.get(3)?,
        last_login_at: row.get(4)?,
        login_count: row.get(5)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        area: row.get(1)?,
        from_user: row.get(2)?,
        to_user: row.get(3)?,
        subject: row.get(4)?,
        body: row.get(5)?,
        posted_at: row.get(6)?,
    })
}

/// A uniqueness violation on `users.username`: the authoritative duplicate
/// signal.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

// ===========================================================================
// Tests
// ===========================================================================
