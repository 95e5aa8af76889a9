//! # Termgate
//!
//! A multi-user text-terminal BBS server core.
//!
//! Peers attach over raw TCP (or WebSocket), log in or register, and move
//! through a menu-driven board with message areas and door games. Every
//! input line is validated and rate-limited before a session acts on it;
//! repeated failed logins lock the origin out.
//!
//! This crate wires the layers together and re-exports what a binary
//! needs. The pieces live in their own crates:
//!
//! - `termgate-transport`: line transports (TCP, WebSocket)
//! - `termgate-protocol`: server/client frames and their codecs
//! - `termgate-guard`: input validator and per-origin rate limiter
//! - `termgate-store`: SQLite credential store and message base
//! - `termgate-session`: the per-connection stage machine
//! - `termgate-door`: the door-game contract and built-in doors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use termgate::prelude::*;
//!
//! # async fn start() -> Result<(), TermgateError> {
//! let config = ServerConfig::from_toml_str("[server]\nport = 2323\n")?;
//! let server = TermgateServer::builder().config(config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{
    ConfigError, FieldSection, ListenerSection, RateLimitSection, ServerConfig, SessionSection,
    StoreSection,
};
pub use error::TermgateError;
pub use server::{TermgateServer, TermgateServerBuilder};

pub mod prelude {
    //! Everything needed to configure and run a server.

    pub use crate::{ConfigError, ServerConfig, TermgateError, TermgateServer, TermgateServerBuilder};
    pub use termgate_door::{DoorCatalog, DoorGame, DoorInfo, DoorOutput};
    pub use termgate_guard::{LimiterConfig, RateLimiter};
    pub use termgate_protocol::{ClientFrame, ServerFrame};
    pub use termgate_store::{CredentialStore, SqliteStore, StoreConfig};
}
