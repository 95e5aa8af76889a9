//! Menu commands, one closed enum per menu.
//!
//! Parsers take the validator's output for a `Command` field, which is
//! already trimmed and upper-cased. Anything outside a menu's whitelist is
//! the explicit `Unknown` variant, never a silent no-op.

/// Commands accepted at the main menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainCommand {
    Messages,
    Doors,
    Users,
    Help,
    Time,
    Logoff,
    /// An empty line: show the menu again.
    Redisplay,
    Unknown(String),
}

impl MainCommand {
    pub fn parse(command: &str) -> Self {
        match command {
            "" => Self::Redisplay,
            "1" | "M" => Self::Messages,
            "2" | "D" => Self::Doors,
            "3" | "U" => Self::Users,
            "4" | "H" | "?" => Self::Help,
            "5" | "T" => Self::Time,
            "Q" | "G" | "QUIT" | "BYE" => Self::Logoff,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Commands accepted while browsing a message area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagesCommand {
    List,
    /// A bare number reads that message.
    Read(i64),
    Post,
    ChangeArea,
    Back,
    Redisplay,
    Unknown(String),
}

impl MessagesCommand {
    pub fn parse(command: &str) -> Self {
        match command {
            "" => Self::Redisplay,
            "L" => Self::List,
            "P" => Self::Post,
            "A" => Self::ChangeArea,
            "B" | "BACK" => Self::Back,
            other => match other.parse::<i64>() {
                Ok(id) if id > 0 => Self::Read(id),
                _ => Self::Unknown(other.to_string()),
            },
        }
    }
}

/// Commands accepted at the door menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoorsCommand {
    /// Launch the door shown as this menu number.
    Launch(usize),
    Back,
    Redisplay,
    Unknown(String),
}

impl DoorsCommand {
    pub fn parse(command: &str) -> Self {
        match command {
            "" => Self::Redisplay,
            "B" | "BACK" => Self::Back,
            other => match other.parse::<usize>() {
                Ok(number) => Self::Launch(number),
                Err(_) => Self::Unknown(other.to_string()),
            },
        }
    }
}

/// A yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    Yes,
    No,
    Unknown,
}

impl Confirm {
    pub fn parse(command: &str) -> Self {
        match command {
            "Y" | "YES" => Self::Yes,
            "N" | "NO" => Self::No,
            _ => Self::Unknown,
        }
    }
}
