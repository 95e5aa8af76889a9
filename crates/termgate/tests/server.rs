//! Integration tests for the Termgate server, handler, and full connection flow.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use termgate::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

const PASSWORD: &str = "Secr3t!pass";

// =========================================================================
// Helpers
// =========================================================================

fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.server.bind = "127.0.0.1".to_string();
    config.server.port = 0;
    config
}

/// Starts a server on a random port and returns its TCP address and store.
async fn start_server(config: ServerConfig) -> (String, Arc<SqliteStore>) {
    let (server, store) = build_server(config).await;
    let addr = server.local_addr().expect("should have local addr").to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, store)
}

async fn build_server(config: ServerConfig) -> (TermgateServer, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory(1_000).expect("store should open"));
    let server = TermgateServer::builder()
        .config(config)
        .store(store.clone())
        .build()
        .await
        .expect("server should build");
    (server, store)
}

/// A raw TCP terminal that reads the text codec's output.
struct Terminal {
    stream: TcpStream,
    pending: Vec<u8>,
}

impl Terminal {
    async fn connect(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).await.expect("should connect");
        Self {
            stream,
            pending: Vec::new(),
        }
    }

    async fn send(&mut self, line: &str) {
        self.stream
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .expect("send should succeed");
    }

    /// Reads until `needle` appears and returns everything up to and
    /// including it.
    async fn read_until(&mut self, needle: &str) -> String {
        let read = async {
            loop {
                let text = String::from_utf8_lossy(&self.pending).to_string();
                if let Some(pos) = text.find(needle) {
                    let end = pos + needle.len();
                    let seen = text[..end].to_string();
                    self.pending = text[end..].as_bytes().to_vec();
                    return seen;
                }
                let mut chunk = [0u8; 1024];
                let n = self.stream.read(&mut chunk).await.expect("read should succeed");
                assert!(n > 0, "connection closed before {needle:?}; got {text:?}");
                self.pending.extend_from_slice(&chunk[..n]);
            }
        };
        tokio::time::timeout(Duration::from_secs(5), read)
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}"))
    }

    /// Reads until the server closes the connection.
    async fn read_to_end(&mut self) -> String {
        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), self.stream.read_to_end(&mut rest))
            .await
            .expect("server should close the connection")
            .expect("read should succeed");
        let mut all = std::mem::take(&mut self.pending);
        all.extend(rest);
        String::from_utf8_lossy(&all).to_string()
    }

    /// Sends `line` and reads up to the next prompt.
    async fn answer(&mut self, line: &str, next_prompt: &str) -> String {
        self.send(line).await;
        self.read_until(next_prompt).await
    }
}

async fn register(addr: &str, name: &str) {
    let mut t = Terminal::connect(addr).await;
    t.read_until("Username: ").await;
    t.answer(name, "(Y/N): ").await;
    t.answer("Y", "Choose a password: ").await;
    t.answer(PASSWORD, "Confirm password: ").await;
    t.answer(PASSWORD, "Real name (optional): ").await;
    t.answer("Amy Pond", "Location (optional): ").await;
    let welcome = t.answer("", "Enter command: ").await;
    assert!(welcome.contains("Registration successful"));
    t.send("Q").await;
    assert!(t.read_to_end().await.contains("Goodbye"));
}

async fn login(addr: &str, name: &str) -> Terminal {
    let mut t = Terminal::connect(addr).await;
    t.read_until("Username: ").await;
    t.answer(name, "Password: ").await;
    let welcome = t.answer(PASSWORD, "Enter command: ").await;
    assert!(welcome.contains("Welcome back"));
    t
}

// =========================================================================
// Authentication
// =========================================================================

#[tokio::test]
async fn test_register_disconnect_relogin_updates_history() {
    let (addr, store) = start_server(test_config()).await;
    register(&addr, "amy").await;

    let mut t = login(&addr, "amy").await;
    t.send("Q").await;
    t.read_to_end().await;

    let user = store.find_user("amy").unwrap();
    assert_eq!(user.login_count, 2);
    assert!(user.last_login_at.is_some());
    assert_eq!(user.real_name.as_deref(), Some("Amy Pond"));
}

#[tokio::test]
async fn test_password_prompt_is_never_echoed() {
    let (addr, _store) = start_server(test_config()).await;
    register(&addr, "amy").await;

    let mut t = Terminal::connect(&addr).await;
    t.read_until("Username: ").await;
    t.answer("amy", "Password: ").await;
    let reply = t.answer("Secr3t!pasX", "Password: ").await;
    assert!(reply.contains("Invalid login"));
    assert!(!reply.contains("Secr3t"));
}

#[tokio::test]
async fn test_lockout_refuses_origin_until_expiry() {
    let mut config = test_config();
    config.rate_limit.login_ceiling = 2;
    config.rate_limit.lockout_secs = 1;
    let (addr, _store) = start_server(config).await;
    register(&addr, "amy").await;

    let mut t = Terminal::connect(&addr).await;
    t.read_until("Username: ").await;
    t.answer("amy", "Password: ").await;
    t.answer("wrong-one", "Password: ").await;
    t.send("wrong-two").await;
    assert!(t.read_to_end().await.contains("from your address"));

    // Refused before any banner or prompt.
    let mut refused = Terminal::connect(&addr).await;
    assert_eq!(refused.read_to_end().await, "");

    tokio::time::sleep(Duration::from_millis(1100)).await;
    let mut t = login(&addr, "amy").await;
    t.send("Q").await;
    t.read_to_end().await;
}

// =========================================================================
// Gate
// =========================================================================

#[tokio::test]
async fn test_command_ceiling_throttles() {
    let mut config = test_config();
    config.rate_limit.command_ceiling = 3;
    let (addr, _store) = start_server(config).await;

    let mut t = Terminal::connect(&addr).await;
    t.read_until("Username: ").await;
    for _ in 0..3 {
        let reply = t.answer("1x", "Username: ").await;
        assert!(reply.contains("Invalid input"));
    }
    let reply = t.answer("amy", "Username: ").await;
    assert!(reply.contains("slow down"));
}

#[tokio::test]
async fn test_injection_rejected_at_every_stage() {
    let (addr, _store) = start_server(test_config()).await;

    let mut t = Terminal::connect(&addr).await;
    t.read_until("Username: ").await;
    let reply = t.answer("x' OR 1=1--", "Username: ").await;
    assert!(reply.contains("forbidden content"));
    drop(t);

    register(&addr, "amy").await;
    let mut t = login(&addr, "amy").await;
    let reply = t.answer("../etc", "Enter command: ").await;
    assert!(reply.contains("forbidden content"));
}

#[tokio::test]
async fn test_oversized_line_rejected_session_continues() {
    let mut config = test_config();
    config.server.max_frame_len = 64;
    let (addr, _store) = start_server(config).await;

    let mut t = Terminal::connect(&addr).await;
    t.read_until("Username: ").await;
    let reply = t.answer(&"a".repeat(100), "Username: ").await;
    assert!(reply.contains("frame exceeds 64 bytes"));
    let reply = t.answer("amy", "(Y/N): ").await;
    assert!(reply.contains("not found"));
}

// =========================================================================
// Timeouts and slots
// =========================================================================

#[tokio::test]
async fn test_idle_timeout_closes_inside_submenu() {
    let mut config = test_config();
    config.session.idle_timeout_secs = 1;
    let (addr, _store) = start_server(config).await;
    register(&addr, "amy").await;

    let mut t = login(&addr, "amy").await;
    t.answer("D", "Select a door: ").await;
    let rest = t.read_to_end().await;
    assert!(rest.contains("inactivity"));
}

#[tokio::test]
async fn test_login_timeout_closes_unauthenticated_peer() {
    let mut config = test_config();
    config.session.login_timeout_secs = 1;
    let (addr, _store) = start_server(config).await;

    let mut t = Terminal::connect(&addr).await;
    t.read_until("Username: ").await;
    assert!(t.read_to_end().await.contains("Login timed out"));
}

#[tokio::test]
async fn test_full_server_sends_busy_notice() {
    let mut config = test_config();
    config.server.max_sessions = 1;
    let (addr, _store) = start_server(config).await;

    let mut first = Terminal::connect(&addr).await;
    first.read_until("Username: ").await;

    let mut second = Terminal::connect(&addr).await;
    assert!(second.read_to_end().await.contains("System busy"));
}

#[tokio::test]
async fn test_full_server_drops_silent_websocket_peer() {
    let mut config = test_config();
    config.server.max_sessions = 1;
    config.server.websocket_port = Some(0);
    config.server.handshake_timeout_secs = 1;
    let (server, _store) = build_server(config).await;
    let addr = server.local_addr().expect("should have local addr").to_string();
    let ws_addr = server
        .websocket_addr()
        .unwrap()
        .expect("websocket listener should be enabled");
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let mut first = Terminal::connect(&addr).await;
    first.read_until("Username: ").await;

    // Connects to the WebSocket port and never sends the upgrade request.
    let mut silent = TcpStream::connect(ws_addr).await.expect("should connect");
    let mut rest = Vec::new();
    let closed =
        tokio::time::timeout(Duration::from_secs(3), silent.read_to_end(&mut rest)).await;
    assert!(closed.is_ok(), "server should drop a peer that stalls the busy refusal");

    first.answer("amy", "(Y/N): ").await;
}

// =========================================================================
// Doors
// =========================================================================

#[tokio::test]
async fn test_door_launch_and_quit_returns_to_menu() {
    let (addr, _store) = start_server(test_config()).await;
    register(&addr, "amy").await;

    let mut t = login(&addr, "amy").await;
    t.answer("D", "Select a door: ").await;
    let screen = t.answer("1", "Enter your choice: ").await;
    assert!(screen.contains("HI-LO CASINO"));
    let back = t.answer("Q", "Enter command: ").await;
    assert!(back.contains("MAIN MENU"));
}

// =========================================================================
// WebSocket / JSON
// =========================================================================

#[tokio::test]
async fn test_websocket_speaks_json_frames() {
    let mut config = test_config();
    config.server.websocket_port = Some(0);
    let (server, _store) = build_server(config).await;
    let ws_addr = server
        .websocket_addr()
        .unwrap()
        .expect("websocket listener should be enabled");
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{ws_addr}"))
        .await
        .expect("should connect");

    let banner = next_frame(&mut ws).await;
    assert!(banner.clear_screen);
    assert_eq!(banner.prompt.as_deref(), Some("Username:"));

    send_input(&mut ws, "amy").await;
    let confirm = next_frame(&mut ws).await;
    assert_eq!(
        confirm.prompt.as_deref(),
        Some("Register as a new user? (Y/N):")
    );
    assert!(!confirm.password_field);

    send_input(&mut ws, "Y").await;
    let password = next_frame(&mut ws).await;
    assert!(password.password_field);
}

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn next_frame(ws: &mut ClientWs) -> ServerFrame {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("should receive within timeout")
        .expect("stream should not end")
        .expect("should not error");
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("valid frame JSON"),
        other => panic!("expected text frame, got {other:?}"),
    }
}

async fn send_input(ws: &mut ClientWs, input: &str) {
    let json = serde_json::to_string(&ClientFrame::new(input)).unwrap();
    ws.send(Message::Text(json.into())).await.unwrap();
}
