//! The `DoorGame` trait: the contract between a session and a door.

use std::fmt;

/// Identifier of a door in the catalog, e.g. `"hilo"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DoorId(String);

impl DoorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DoorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A door's answer to one input line.
///
/// `done` hands control back to the session; any lines in the same output
/// are still shown before the main menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoorOutput {
    pub lines: Vec<String>,
    pub prompt: Option<String>,
    pub done: bool,
}

impl DoorOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.lines.push(text.into());
        self
    }

    pub fn push(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Marks the door as finished.
    pub fn finished(mut self) -> Self {
        self.done = true;
        self.prompt = None;
        self
    }
}

/// A running door game, owned by exactly one session.
///
/// The session calls [`start`](DoorGame::start) once, then
/// [`handle_line`](DoorGame::handle_line) for every line until an output
/// has `done` set. Lines arrive already validated and HTML-escaped.
///
/// Doors are synchronous and must return promptly: they run inline on the
/// session's task. `Sync` because the session is borrowed across its own
/// await points.
pub trait DoorGame: Send + Sync + 'static {
    /// Starts the game for `player` and returns the opening screen.
    fn start(&mut self, player: &str) -> DoorOutput;

    /// Processes one line of player input.
    fn handle_line(&mut self, line: &str) -> DoorOutput;

    /// Called if the session ends while the door is still running.
    /// Default: no-op.
    fn on_disconnect(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_door_id_display() {
        assert_eq!(DoorId::new("hilo").to_string(), "hilo");
    }

    #[test]
    fn test_door_output_finished_clears_prompt() {
        let out = DoorOutput::new().line("bye").prompt("Guess:").finished();
        assert!(out.done);
        assert!(out.prompt.is_none());
        assert_eq!(out.lines, vec!["bye"]);
    }
}
