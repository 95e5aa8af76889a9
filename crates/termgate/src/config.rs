//! Server configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Durations are whole seconds in the file.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 2323
//! websocket_port = 8080
//!
//! [rate_limit]
//! login_ceiling = 5
//! lockout_secs = 300
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use termgate_guard::{FieldLimits, LimiterConfig};
use termgate_session::SessionConfig;
use termgate_store::StoreConfig;

/// Longest duration any `*_secs` setting may hold: one year.
const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Why a configuration could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parse but make no sense together.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// `[server]`: listeners and connection handling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenerSection {
    pub bind: String,
    /// Raw TCP line port.
    pub port: u16,
    /// WebSocket port; omit to disable the WebSocket listener.
    pub websocket_port: Option<u16>,
    pub max_sessions: usize,
    /// Longest accepted input line, in bytes.
    pub max_frame_len: usize,
    pub handshake_timeout_secs: u64,
    /// How often idle limiter origins are swept.
    pub sweep_interval_secs: u64,
    pub board_name: String,
}

impl Default for ListenerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 2323,
            websocket_port: None,
            max_sessions: 100,
            max_frame_len: 4096,
            handshake_timeout_secs: 10,
            sweep_interval_secs: 60,
            board_name: "Termgate BBS".to_string(),
        }
    }
}

/// `[session]`: per-connection timers and limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    pub idle_timeout_secs: u64,
    pub login_timeout_secs: u64,
    pub login_retry_cap: u32,
    pub message_body_max: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            idle_timeout_secs: defaults.idle_timeout.as_secs(),
            login_timeout_secs: defaults.login_timeout.as_secs(),
            login_retry_cap: defaults.login_retry_cap,
            message_body_max: defaults.message_body_max,
        }
    }
}

/// `[rate_limit]`: per-origin command and login tracks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitSection {
    pub command_ceiling: usize,
    pub command_window_secs: u64,
    pub login_ceiling: usize,
    pub login_window_secs: u64,
    pub lockout_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        let defaults = LimiterConfig::default();
        Self {
            command_ceiling: defaults.command_ceiling,
            command_window_secs: defaults.command_window.as_secs(),
            login_ceiling: defaults.login_ceiling,
            login_window_secs: defaults.login_window.as_secs(),
            lockout_secs: defaults.lockout.as_secs(),
        }
    }
}

/// `[fields]`: validator length bounds, in characters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldSection {
    pub username_min: usize,
    pub username_max: usize,
    pub password_min: usize,
    pub password_max: usize,
    pub command_max: usize,
    pub text_max: usize,
    pub subject_max: usize,
    pub profile_max: usize,
}

impl Default for FieldSection {
    fn default() -> Self {
        let d = FieldLimits::default();
        Self {
            username_min: d.username_min,
            username_max: d.username_max,
            password_min: d.password_min,
            password_max: d.password_max,
            command_max: d.command_max,
            text_max: d.text_max,
            subject_max: d.subject_max,
            profile_max: d.profile_max,
        }
    }
}

/// `[store]`: the SQLite credential store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub path: PathBuf,
    pub hash_iterations: u32,
    pub busy_timeout_secs: u64,
    /// Bound on one store call made by a session.
    pub timeout_secs: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        let defaults = StoreConfig::default();
        Self {
            path: defaults.path,
            hash_iterations: defaults.hash_iterations,
            busy_timeout_secs: defaults.busy_timeout.as_secs(),
            timeout_secs: SessionConfig::default().store_timeout.as_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub server: ListenerSection,
    pub session: SessionSection,
    pub rate_limit: RateLimitSection,
    pub fields: FieldSection,
    pub store: StoreSection,
}

impl ServerConfig {
    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.server.max_sessions == 0 {
            return invalid("server.max_sessions must be at least 1");
        }
        if self.server.max_frame_len == 0 {
            return invalid("server.max_frame_len must be at least 1");
        }
        if self.server.handshake_timeout_secs == 0 || self.server.sweep_interval_secs == 0 {
            return invalid("server timeouts and intervals must be non-zero");
        }
        if self.session.idle_timeout_secs == 0 || self.session.login_timeout_secs == 0 {
            return invalid("session timeouts must be non-zero");
        }
        if self.session.login_retry_cap == 0 {
            return invalid("session.login_retry_cap must be at least 1");
        }
        let rl = &self.rate_limit;
        if rl.command_ceiling == 0 || rl.login_ceiling == 0 {
            return invalid("rate_limit ceilings must be at least 1");
        }
        if rl.command_window_secs == 0 || rl.login_window_secs == 0 || rl.lockout_secs == 0 {
            return invalid("rate_limit windows and lockout must be non-zero");
        }
        let f = &self.fields;
        if f.username_min == 0 || f.username_min > f.username_max {
            return invalid("fields.username_min must be between 1 and username_max");
        }
        if f.password_min == 0 || f.password_min > f.password_max {
            return invalid("fields.password_min must be between 1 and password_max");
        }
        if f.command_max == 0 || f.text_max == 0 || f.subject_max == 0 || f.profile_max == 0 {
            return invalid("field maxima must be non-zero");
        }
        if self.store.hash_iterations == 0 {
            return invalid("store.hash_iterations must be at least 1");
        }
        if self.store.timeout_secs == 0 {
            return invalid("store.timeout_secs must be non-zero");
        }

        let durations = [
            ("server.handshake_timeout_secs", self.server.handshake_timeout_secs),
            ("server.sweep_interval_secs", self.server.sweep_interval_secs),
            ("session.idle_timeout_secs", self.session.idle_timeout_secs),
            ("session.login_timeout_secs", self.session.login_timeout_secs),
            ("rate_limit.command_window_secs", rl.command_window_secs),
            ("rate_limit.login_window_secs", rl.login_window_secs),
            ("rate_limit.lockout_secs", rl.lockout_secs),
            ("store.busy_timeout_secs", self.store.busy_timeout_secs),
            ("store.timeout_secs", self.store.timeout_secs),
        ];
        if let Some((key, _)) = durations
            .iter()
            .find(|(_, secs)| *secs > MAX_DURATION_SECS)
        {
            return Err(ConfigError::Invalid(format!(
                "{key} must not exceed {MAX_DURATION_SECS} seconds"
            )));
        }
        Ok(())
    }

    /// `bind:port` for the TCP listener.
    pub fn tcp_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }

    /// `bind:websocket_port`, if the WebSocket listener is enabled.
    pub fn websocket_addr(&self) -> Option<String> {
        self.server
            .websocket_port
            .map(|port| format!("{}:{}", self.server.bind, port))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            board_name: self.server.board_name.clone(),
            idle_timeout: Duration::from_secs(self.session.idle_timeout_secs),
            login_timeout: Duration::from_secs(self.session.login_timeout_secs),
            login_retry_cap: self.session.login_retry_cap,
            store_timeout: Duration::from_secs(self.store.timeout_secs),
            message_body_max: self.session.message_body_max,
        }
    }

    pub fn limiter_config(&self) -> LimiterConfig {
        let rl = &self.rate_limit;
        LimiterConfig {
            command_ceiling: rl.command_ceiling,
            command_window: Duration::from_secs(rl.command_window_secs),
            login_ceiling: rl.login_ceiling,
            login_window: Duration::from_secs(rl.login_window_secs),
            lockout: Duration::from_secs(rl.lockout_secs),
        }
    }

    pub fn field_limits(&self) -> FieldLimits {
        let f = &self.fields;
        FieldLimits {
            username_min: f.username_min,
            username_max: f.username_max,
            password_min: f.password_min,
            password_max: f.password_max,
            command_max: f.command_max,
            text_max: f.text_max,
            subject_max: f.subject_max,
            profile_max: f.profile_max,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            path: self.store.path.clone(),
            hash_iterations: self.store.hash_iterations,
            busy_timeout: Duration::from_secs(self.store.busy_timeout_secs),
        }
    }
}
