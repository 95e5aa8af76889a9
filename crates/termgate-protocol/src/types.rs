//! Frame types for Termgate's wire format.
//!
//! A terminal conversation is strictly request/response: the server emits a
//! [`ServerFrame`], the client answers with one line, which arrives as a
//! [`ClientFrame`]. These are the only two things that travel on the wire.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ServerFrame: server → client
// ---------------------------------------------------------------------------

/// One logical unit of server output.
///
/// A frame carries zero or more text lines, an optional prompt for the next
/// input, and three flags telling the client how to render it:
///
/// - `clear_screen`: discard earlier output before drawing this frame.
/// - `password_field`: mask the next input the user types.
/// - `session_ended`: the server is about to close; stop reading.
///
/// ## JSON shape
///
/// The lines are serialized under the key `"output"`, which is what browser
/// terminals expect:
///
/// ```json
/// {"output":["Welcome"],"prompt":"Username:","clear_screen":true,
///  "password_field":false,"session_ended":false}
/// ```
///
/// Every field has `#[serde(default)]`, so a client that builds frames
/// for tests can omit anything it doesn't care about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFrame {
    /// The text lines to display, in order. No line contains `\n`.
    #[serde(rename = "output", default)]
    pub lines: Vec<String>,

    /// The prompt shown after the lines, if the server expects input.
    #[serde(default)]
    pub prompt: Option<String>,

    /// Clear the screen before rendering.
    #[serde(default)]
    pub clear_screen: bool,

    /// The next input is sensitive and must not be echoed.
    #[serde(default)]
    pub password_field: bool,

    /// The session is over; the server closes the connection next.
    #[serde(default)]
    pub session_ended: bool,
}

impl ServerFrame {
    /// Creates an empty frame: no lines, no prompt, no flags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one line. Embedded newlines are split into separate lines so
    /// the "no line contains `\n`" rule holds for every frame.
    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.push_line(text);
        self
    }

    /// Appends several lines.
    pub fn lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            self.push_line(line);
        }
        self
    }

    /// Appends one line in place.
    pub fn push_line(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.contains('\n') {
            self.lines.extend(
                text.split('\n')
                    .map(|part| part.trim_end_matches('\r').to_string()),
            );
        } else {
            self.lines.push(text);
        }
    }

    /// Sets the prompt for the next input.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Marks the frame as clearing the screen.
    pub fn clear(mut self) -> Self {
        self.clear_screen = true;
        self
    }

    /// Marks the next input as a password.
    pub fn password(mut self) -> Self {
        self.password_field = true;
        self
    }

    /// Marks the frame as the last one of the session.
    pub fn ended(mut self) -> Self {
        self.session_ended = true;
        self.prompt = None;
        self.password_field = false;
        self
    }

    /// Merges `next` into `self`: lines are appended, a prompt in `next`
    /// replaces ours, `clear_screen`/`session_ended` are OR-ed together and
    /// `password_field` follows `next`, since it describes the next prompt.
    ///
    /// The session uses this when one input produces output from two
    /// places, e.g. a confirmation followed by the menu it returns to.
    pub fn append(&mut self, next: ServerFrame) {
        self.lines.extend(next.lines);
        if next.prompt.is_some() {
            self.prompt = next.prompt;
        }
        self.clear_screen |= next.clear_screen;
        self.password_field = next.password_field;
        self.session_ended |= next.session_ended;
    }
}

// ---------------------------------------------------------------------------
// ClientFrame: client → server
// ---------------------------------------------------------------------------

/// One line of client input, delimiter already stripped.
///
/// An empty `input` is valid: "press Enter to continue" prompts rely on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFrame {
    /// The raw line as typed by the user.
    #[serde(default)]
    pub input: String,
}

impl ClientFrame {
    /// Wraps a line of input.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
