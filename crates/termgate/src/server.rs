//! `TermgateServer` builder and accept loops.
//!
//! This is the entry point for running a Termgate server. It ties the
//! layers together: transport → protocol → session → guard/store/doors.
//!
//! ```text
//! accept ─→ origin locked out? ──yes──→ close silently
//!              │ no
//!              ▼
//!          session slot free? ──no──→ busy notice (bounded), close
//!              │ yes
//!              ▼
//!          spawn task: establish (bounded) → handle_connection
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use termgate_door::DoorCatalog;
use termgate_guard::{RateLimiter, Validator};
use termgate_protocol::{FrameCodec, JsonCodec, ServerFrame, TextCodec};
use termgate_session::SessionContext;
use termgate_store::{CredentialStore, SqliteStore};
use termgate_transport::{Incoming, TcpLineTransport, Transport, WebSocketTransport};
use tokio::sync::Semaphore;

use crate::handler::handle_connection;
use crate::{ServerConfig, TermgateError};

/// Sent to a peer that connects while every session slot is taken.
const BUSY_NOTICE: &str = "System busy. Please try again later.";

/// Shared server state passed to each connection task.
pub(crate) struct ServerState {
    pub(crate) ctx: Arc<SessionContext>,
    pub(crate) slots: Arc<Semaphore>,
    pub(crate) handshake_timeout: Duration,
}

/// Builder for configuring and starting a Termgate server.
///
/// # Example
///
/// ```rust,ignore
/// use termgate::prelude::*;
///
/// let config = ServerConfig::load("termgate.toml")?;
/// let server = TermgateServer::builder().config(config).build().await?;
/// server.run().await
/// ```
pub struct TermgateServerBuilder {
    config: ServerConfig,
    store: Option<Arc<dyn CredentialStore>>,
    doors: DoorCatalog,
}

impl TermgateServerBuilder {
    /// Creates a builder with default settings and the built-in doors.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            store: None,
            doors: DoorCatalog::with_builtin(),
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `store` instead of opening the SQLite file named in the
    /// configuration.
    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces the door catalog.
    pub fn doors(mut self, doors: DoorCatalog) -> Self {
        self.doors = doors;
        self
    }

    /// Validates the configuration, opens the store and binds the
    /// listeners.
    ///
    /// Raw TCP speaks [`TextCodec`]; WebSocket (if a port is configured)
    /// speaks [`JsonCodec`].
    pub async fn build(self) -> Result<TermgateServer, TermgateError> {
        let config = self.config;
        config.validate()?;

        let store: Arc<dyn CredentialStore> = match self.store {
            Some(store) => store,
            None => Arc::new(SqliteStore::open(&config.store_config())?),
        };

        let ctx = Arc::new(SessionContext::new(
            config.session_config(),
            Validator::new(config.field_limits()),
            Arc::new(RateLimiter::new(config.limiter_config())),
            store,
            self.doors,
        ));

        let max_frame = config.server.max_frame_len;
        let tcp = TcpLineTransport::bind_with_limit(&config.tcp_addr(), max_frame).await?;
        let websocket = match config.websocket_addr() {
            Some(addr) => Some(WebSocketTransport::bind_with_limit(&addr, max_frame).await?),
            None => None,
        };

        let state = Arc::new(ServerState {
            ctx,
            slots: Arc::new(Semaphore::new(config.server.max_sessions)),
            handshake_timeout: Duration::from_secs(config.server.handshake_timeout_secs),
        });

        Ok(TermgateServer {
            tcp,
            websocket,
            state,
            sweep_interval: Duration::from_secs(config.server.sweep_interval_secs),
        })
    }
}

impl Default for TermgateServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Termgate server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TermgateServer {
    tcp: TcpLineTransport,
    websocket: Option<WebSocketTransport>,
    state: Arc<ServerState>,
    sweep_interval: Duration,
}

impl TermgateServer {
    /// Creates a new builder.
    pub fn builder() -> TermgateServerBuilder {
        TermgateServerBuilder::new()
    }

    /// The address of the raw TCP listener.
    pub fn local_addr(&self) -> Result<SocketAddr, TermgateError> {
        Ok(self.tcp.local_addr()?)
    }

    /// The address of the WebSocket listener, if enabled.
    pub fn websocket_addr(&self) -> Result<Option<SocketAddr>, TermgateError> {
        match &self.websocket {
            Some(ws) => Ok(Some(ws.local_addr()?)),
            None => Ok(None),
        }
    }

    /// The shared per-origin rate limiter.
    pub fn limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.state.ctx.limiter)
    }

    /// Runs the accept loops and the limiter sweep. Runs until the process
    /// is terminated.
    pub async fn run(self) -> Result<(), TermgateError> {
        tracing::info!(addr = %self.local_addr()?, "termgate listening (tcp)");
        if let Some(addr) = self.websocket_addr()? {
            tracing::info!(%addr, "termgate listening (websocket)");
        }

        tokio::spawn(sweep_loop(self.limiter(), self.sweep_interval));

        let tcp = accept_loop(self.tcp, Arc::new(TextCodec), Arc::clone(&self.state));
        match self.websocket {
            Some(ws) => {
                let ws = accept_loop(ws, Arc::new(JsonCodec), Arc::clone(&self.state));
                tokio::join!(tcp, ws);
            }
            None => tcp.await,
        }
        Ok(())
    }
}

/// Turns a peer away in the background. A peer that stalls the handshake
/// or the notice is dropped once `bound` passes.
fn refuse<I: Incoming>(incoming: I, notice: Vec<u8>, bound: Duration) {
    let peer = incoming.peer_addr();
    tokio::spawn(async move {
        if tokio::time::timeout(bound, incoming.refuse(&notice)).await.is_err() {
            tracing::debug!(%peer, ?bound, "refusal timed out");
        }
    });
}

/// Accepts peers on one transport forever.
async fn accept_loop<T>(mut transport: T, codec: Arc<dyn FrameCodec>, state: Arc<ServerState>)
where
    T: Transport,
{
    loop {
        let incoming = match transport.accept().await {
            Ok(incoming) => incoming,
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
                continue;
            }
        };
        let peer = incoming.peer_addr();

        // Locked-out origins are turned away before they cost a slot.
        if let Err(err) = state.ctx.limiter.check_connection(peer.ip(), Instant::now()) {
            tracing::warn!(%peer, %err, "refusing locked-out origin");
            refuse(incoming, Vec::new(), state.handshake_timeout);
            continue;
        }

        let permit = match Arc::clone(&state.slots).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(%peer, "all session slots busy");
                refuse(incoming, busy_notice(codec.as_ref()), state.handshake_timeout);
                continue;
            }
        };

        let state = Arc::clone(&state);
        let codec = Arc::clone(&codec);
        tokio::spawn(async move {
            // Held for the life of the connection.
            let _permit = permit;
            let conn = match tokio::time::timeout(state.handshake_timeout, incoming.establish())
                .await
            {
                Ok(Ok(conn)) => conn,
                Ok(Err(e)) => {
                    tracing::debug!(%peer, error = %e, "handshake failed");
                    return;
                }
                Err(_) => {
                    tracing::debug!(%peer, "handshake timed out");
                    return;
                }
            };
            if let Err(e) = handle_connection(conn, codec, state).await {
                tracing::debug!(%peer, error = %e, "connection ended with error");
            }
        });
    }
}

fn busy_notice(codec: &dyn FrameCodec) -> Vec<u8> {
    let frame = ServerFrame::new().line(BUSY_NOTICE).ended();
    codec.encode(&frame).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to encode busy notice");
        Vec::new()
    })
}

/// Drops limiter origins whose windows have all emptied.
async fn sweep_loop(limiter: Arc<RateLimiter>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        limiter.sweep(Instant::now());
    }
}
