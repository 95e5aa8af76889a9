//! Frame codecs: how a [`ServerFrame`] becomes bytes and how a line of
//! bytes becomes a [`ClientFrame`].
//!
//! The session never sees bytes. It produces frames, and the listener runs
//! them through whichever [`FrameCodec`] matches the transport:
//!
//! - [`TextCodec`] for raw TCP terminals (telnet, netcat).
//! - [`JsonCodec`] for browser terminals over WebSocket.

use crate::{ClientFrame, ProtocolError, ServerFrame};

/// ANSI sequence that clears the screen and homes the cursor.
pub const ANSI_CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Converts frames to and from their on-the-wire form.
///
/// `Send + Sync + 'static` so one codec instance can be shared by every
/// connection task through an `Arc`.
pub trait FrameCodec: Send + Sync + 'static {
    /// Encodes one server frame.
    fn encode(&self, frame: &ServerFrame) -> Result<Vec<u8>, ProtocolError>;

    /// Decodes one client line (delimiter already stripped by the transport).
    fn decode(&self, data: &[u8]) -> Result<ClientFrame, ProtocolError>;
}

// ---------------------------------------------------------------------------
// TextCodec
// ---------------------------------------------------------------------------

/// A [`FrameCodec`] for plain terminals.
///
/// Output rules:
/// - `clear_screen` becomes [`ANSI_CLEAR_SCREEN`] at the start of the frame.
/// - Each line is terminated by CRLF, as telnet expects.
/// - The prompt is written last, followed by one space and no newline, so
///   the cursor waits right after it.
///
/// `password_field` has no byte-level representation here; the frame's
/// text simply never contains the password. `session_ended` is implied by
/// the server closing the socket right after.
///
/// Input must be valid UTF-8. Anything else is rejected rather than
/// lossily repaired, so the validator never sees replacement characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl FrameCodec for TextCodec {
    fn encode(&self, frame: &ServerFrame) -> Result<Vec<u8>, ProtocolError> {
        let mut out = String::new();
        if frame.clear_screen {
            out.push_str(ANSI_CLEAR_SCREEN);
        }
        for line in &frame.lines {
            out.push_str(line);
            out.push_str("\r\n");
        }
        if let Some(prompt) = &frame.prompt {
            out.push_str(prompt);
            if !prompt.ends_with(' ') {
                out.push(' ');
            }
        }
        Ok(out.into_bytes())
    }

    fn decode(&self, data: &[u8]) -> Result<ClientFrame, ProtocolError> {
        let text = std::str::from_utf8(data).map_err(|_| {
            ProtocolError::InvalidMessage("input is not valid UTF-8".into())
        })?;
        Ok(ClientFrame::new(text))
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`FrameCodec`] that speaks JSON (via `serde_json`).
///
/// Server frames are serialized whole, see [`ServerFrame`] for the shape.
/// Client messages must be `{"input": "..."}`.
///
/// ## Example
///
/// ```rust
/// use termgate_protocol::{FrameCodec, JsonCodec, ServerFrame};
///
/// let codec = JsonCodec;
/// let bytes = codec
///     .encode(&ServerFrame::new().line("Hi").with_prompt("Username:"))
///     .unwrap();
/// assert!(String::from_utf8(bytes).unwrap().contains("\"output\":[\"Hi\"]"));
///
/// let input = codec.decode(br#"{"input":"alice"}"#).unwrap();
/// assert_eq!(input.input, "alice");
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl FrameCodec for JsonCodec {
    fn encode(&self, frame: &ServerFrame) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(frame).map_err(ProtocolError::Encode)
    }

    fn decode(&self, data: &[u8]) -> Result<ClientFrame, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn text(frame: &ServerFrame) -> String {
        String::from_utf8(TextCodec.encode(frame).unwrap()).unwrap()
    }

    // =======================================================================
    // TextCodec
    // =======================================================================

    #[test]
    fn test_text_encode_lines_use_crlf() {
        let frame = ServerFrame::new().line("one").line("two");
        assert_eq!(text(&frame), "one\r\ntwo\r\n");
    }

    #[test]
    fn test_text_encode_prompt_has_no_newline() {
        let frame = ServerFrame::new().line("Welcome").with_prompt("Username:");
        assert_eq!(text(&frame), "Welcome\r\nUsername: ");
    }

    #[test]
    fn test_text_encode_prompt_trailing_space_not_doubled() {
        let frame = ServerFrame::new().with_prompt("> ");
        assert_eq!(text(&frame), "> ");
    }

    #[test]
    fn test_text_encode_clear_screen_prefix() {
        let frame = ServerFrame::new().clear().line("Menu");
        assert_eq!(text(&frame), format!("{ANSI_CLEAR_SCREEN}Menu\r\n"));
    }

    #[test]
    fn test_text_encode_empty_frame_is_empty() {
        assert!(TextCodec.encode(&ServerFrame::new()).unwrap().is_empty());
    }

    #[test]
    fn test_text_decode_keeps_empty_line() {
        let frame = TextCodec.decode(b"").unwrap();
        assert_eq!(frame.input, "");
    }

    #[test]
    fn test_text_decode_invalid_utf8_returns_error() {
        let result = TextCodec.decode(&[0x66, 0xff, 0xfe]);
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }

    // =======================================================================
    // JsonCodec
    // =======================================================================

    #[cfg(feature = "json")]
    #[test]
    fn test_json_encode_carries_all_flags() {
        let frame = ServerFrame::new()
            .line("Password for alice")
            .with_prompt("Password:")
            .password();
        let bytes = JsonCodec.encode(&frame).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["password_field"], true);
        assert_eq!(value["prompt"], "Password:");
        assert_eq!(value["output"][0], "Password for alice");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_decode_garbage_returns_error() {
        let result = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_decode_input_frame() {
        let frame = JsonCodec.decode(br#"{"input":"Q"}"#).unwrap();
        assert_eq!(frame.input, "Q");
    }
}
