//! Per-connection handler: banner, read loop, teardown.
//!
//! Each established connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Open the session (a locked-out origin is closed without a word)
//!   2. Send the banner frame
//!   3. Loop: read one line with the session's deadline as the bound,
//!      pass it to the session, send back the frame
//!   4. Close once the session reaches `Disconnecting` or the peer leaves

use std::sync::Arc;

use termgate_protocol::{FrameCodec, ServerFrame};
use termgate_session::Session;
use termgate_transport::Connection;

use crate::TermgateError;
use crate::server::ServerState;

/// Handles a single connection from establish to close.
pub(crate) async fn handle_connection<C>(
    conn: C,
    codec: Arc<dyn FrameCodec>,
    state: Arc<ServerState>,
) -> Result<(), TermgateError>
where
    C: Connection,
{
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    tracing::debug!(%conn_id, %peer, "handling new connection");

    let mut session = Session::new(Arc::clone(&state.ctx), peer.ip(), conn_id.into_inner());
    let banner = match session.open() {
        Ok(frame) => frame,
        Err(err) => {
            tracing::debug!(%conn_id, %peer, error = %err, "session refused at open");
            let _ = conn.close().await;
            return Ok(());
        }
    };

    let result = match send_frame(&conn, codec.as_ref(), &banner).await {
        Ok(()) => run_session(&conn, codec.as_ref(), &mut session).await,
        Err(e) => Err(e),
    };

    // Whatever ended the loop, the session must be closed exactly once.
    if !session.is_finished() {
        session.on_peer_closed();
    }
    let _ = conn.close().await;
    result
}

/// Reads lines until the session finishes.
async fn run_session<C>(
    conn: &C,
    codec: &dyn FrameCodec,
    session: &mut Session,
) -> Result<(), TermgateError>
where
    C: Connection,
{
    let conn_id = conn.id();

    while !session.is_finished() {
        let deadline = tokio::time::Instant::from_std(session.deadline());
        let frame = match tokio::time::timeout_at(deadline, conn.recv()).await {
            Err(_) => session.on_timeout(),
            Ok(Ok(None)) => {
                tracing::debug!(%conn_id, "connection closed by peer");
                session.on_peer_closed();
                return Ok(());
            }
            Ok(Ok(Some(bytes))) => match codec.decode(&bytes) {
                Ok(client) => session.handle_line(&client.input).await,
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "undecodable frame");
                    session.reject_input("Invalid input: could not read that line.")
                }
            },
            Ok(Err(e)) if e.is_recoverable() => {
                tracing::debug!(%conn_id, error = %e, "oversized frame");
                session.reject_input(&format!("Invalid input: {e}."))
            }
            Ok(Err(e)) => {
                session.on_peer_closed();
                return Err(e.into());
            }
        };
        send_frame(conn, codec, &frame).await?;
    }
    Ok(())
}

async fn send_frame<C>(
    conn: &C,
    codec: &dyn FrameCodec,
    frame: &ServerFrame,
) -> Result<(), TermgateError>
where
    C: Connection,
{
    let bytes = codec.encode(frame)?;
    conn.send(&bytes).await?;
    Ok(())
}
