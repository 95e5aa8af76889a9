//! Wire protocol for Termgate.
//!
//! This crate defines what a session says to a terminal and what the
//! terminal says back:
//!
//! - **Types** ([`ServerFrame`], [`ClientFrame`]): one logical unit of
//!   output (lines + prompt + flags) and one line of input.
//! - **Codecs** ([`FrameCodec`] trait, [`TextCodec`], [`JsonCodec`]): how
//!   frames become bytes for a particular transport.
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding or
//!   decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw line bytes) and the
//! session (stage machine). It knows nothing about connections or users.
//!
//! ```text
//! Transport (line bytes) → Protocol (ClientFrame) → Session
//! Session → Protocol (ServerFrame) → Transport (encoded bytes)
//! ```
//!
//! Both codecs carry the same logical fields. A raw TCP terminal gets
//! CRLF text with ANSI clear-screen; a browser terminal gets JSON and can
//! honor `password_field` and `session_ended` itself.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use codec::{FrameCodec, TextCodec, ANSI_CLEAR_SCREEN};
pub use error::ProtocolError;
pub use types::{ClientFrame, ServerFrame};
