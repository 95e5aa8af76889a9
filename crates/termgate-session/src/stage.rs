//! Where a session is in its conversation with the peer.
//!
//! ```text
//!   Connecting ──banner──→ AuthUsername ──known──→ AuthPassword ──ok──→ MenuMain
//!                              │                                         │  ↑
//!                           unknown                                      ↓  │ back
//!                              ↓                                      MenuSub(kind)
//!                     AuthRegisterConfirm ──Y──→ Register(step) ──→ MenuMain
//!                                                                        │  ↑
//!                                                                  door  ↓  │ done
//!                                                                   GameActive(id)
//!
//!   any stage ──logoff / timeout / peer close / lockout──→ Disconnecting
//! ```
//!
//! Every piece of information a stage needs (the username being checked,
//! the password being confirmed, the message being composed) lives inside
//! the variant, so a stage can't be entered without it.

use std::fmt;

use termgate_door::DoorId;
use termgate_guard::FieldKind;

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// A password held between registration steps. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

// ---------------------------------------------------------------------------
// Message areas
// ---------------------------------------------------------------------------

/// The message-base areas, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    General,
    Gaming,
    Technical,
    Announcements,
}

impl Area {
    pub const ALL: [Area; 4] = [
        Area::General,
        Area::Gaming,
        Area::Technical,
        Area::Announcements,
    ];

    /// The key stored in the `area` column.
    pub fn key(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Gaming => "gaming",
            Self::Technical => "technical",
            Self::Announcements => "announcements",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::General => "General Discussion",
            Self::Gaming => "Gaming",
            Self::Technical => "Technical",
            Self::Announcements => "Announcements",
        }
    }

    /// Announcements are posted by the operator out of band.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Announcements)
    }

    /// The area shown as menu item `number` (1-based).
    pub fn from_number(number: usize) -> Option<Area> {
        number.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

/// What the message area is doing right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageMode {
    /// Waiting for a messages-menu command.
    Browse,
    /// Waiting for an area number.
    ChooseArea,
    /// Composing a post: waiting for the subject.
    PostSubject,
    /// Composing a post: collecting body lines until `END`.
    PostBody { subject: String, body: Vec<String> },
}

/// Message-area state: the current area and mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub area: Area,
    pub mode: MessageMode,
}

impl MessageView {
    pub fn browse(area: Area) -> Self {
        Self {
            area,
            mode: MessageMode::Browse,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Registration steps after the user agreed to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterStep {
    Password,
    ConfirmPassword {
        password: Secret,
    },
    RealName {
        password: Secret,
    },
    Location {
        password: Secret,
        real_name: Option<String>,
    },
}

/// The submenus reachable from the main menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubMenu {
    Messages(MessageView),
    Doors,
    /// The user list; any input returns to the main menu.
    Users,
    /// The help screen; any input returns to the main menu.
    Help,
}

/// The session's position in the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Accepted, banner not yet sent.
    Connecting,
    AuthUsername,
    AuthPassword {
        username: String,
    },
    /// The username does not exist; waiting for Y/N.
    AuthRegisterConfirm {
        username: String,
    },
    Register {
        username: String,
        step: RegisterStep,
    },
    MenuMain,
    MenuSub(SubMenu),
    GameActive(DoorId),
    /// Terminal. The connection closes after the current frame.
    Disconnecting,
}

impl Stage {
    /// Returns `true` if the next input is a password and must not be
    /// echoed.
    pub fn password_field(&self) -> bool {
        matches!(
            self,
            Stage::AuthPassword { .. }
                | Stage::Register {
                    step: RegisterStep::Password | RegisterStep::ConfirmPassword { .. },
                    ..
                }
        )
    }

    /// Returns `true` until the peer is logged in. The login timeout only
    /// applies while this holds.
    pub fn is_authenticating(&self) -> bool {
        matches!(
            self,
            Stage::Connecting
                | Stage::AuthUsername
                | Stage::AuthPassword { .. }
                | Stage::AuthRegisterConfirm { .. }
                | Stage::Register { .. }
        )
    }

    /// The validator field the next input line is checked as.
    pub fn field_kind(&self) -> FieldKind {
        match self {
            Stage::AuthUsername => FieldKind::Username,
            Stage::AuthPassword { .. } => FieldKind::Password,
            Stage::Register { step, .. } => match step {
                RegisterStep::Password | RegisterStep::ConfirmPassword { .. } => {
                    FieldKind::Password
                }
                RegisterStep::RealName { .. } | RegisterStep::Location { .. } => {
                    FieldKind::Profile
                }
            },
            Stage::MenuSub(SubMenu::Messages(view)) => match view.mode {
                MessageMode::Browse | MessageMode::ChooseArea => FieldKind::Command,
                MessageMode::PostSubject => FieldKind::Subject,
                MessageMode::PostBody { .. } => FieldKind::Text,
            },
            Stage::MenuSub(SubMenu::Users | SubMenu::Help) | Stage::GameActive(_) => {
                FieldKind::Text
            }
            Stage::Connecting
            | Stage::AuthRegisterConfirm { .. }
            | Stage::MenuMain
            | Stage::MenuSub(SubMenu::Doors)
            | Stage::Disconnecting => FieldKind::Command,
        }
    }

    /// The prompt shown when this stage waits for input.
    ///
    /// `GameActive` has none of its own; the door supplies it.
    pub fn prompt(&self) -> Option<&'static str> {
        let prompt = match self {
            Stage::Connecting | Stage::GameActive(_) | Stage::Disconnecting => return None,
            Stage::AuthUsername => "Username:",
            Stage::AuthPassword { .. } => "Password:",
            Stage::AuthRegisterConfirm { .. } => "Register as a new user? (Y/N):",
            Stage::Register { step, .. } => match step {
                RegisterStep::Password => "Choose a password:",
                RegisterStep::ConfirmPassword { .. } => "Confirm password:",
                RegisterStep::RealName { .. } => "Real name (optional):",
                RegisterStep::Location { .. } => "Location (optional):",
            },
            Stage::MenuMain => "Enter command:",
            Stage::MenuSub(SubMenu::Messages(view)) => match view.mode {
                MessageMode::Browse => "Messages command:",
                MessageMode::ChooseArea => "Area number:",
                MessageMode::PostSubject => "Subject:",
                MessageMode::PostBody { .. } => ">",
            },
            Stage::MenuSub(SubMenu::Doors) => "Select a door:",
            Stage::MenuSub(SubMenu::Users | SubMenu::Help) => "Press Enter to continue...",
        };
        Some(prompt)
    }

    /// Short name for log lines. Never includes user data.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Connecting => "connecting",
            Stage::AuthUsername => "auth-username",
            Stage::AuthPassword { .. } => "auth-password",
            Stage::AuthRegisterConfirm { .. } => "auth-register-confirm",
            Stage::Register { .. } => "register",
            Stage::MenuMain => "menu-main",
            Stage::MenuSub(SubMenu::Messages(_)) => "menu-messages",
            Stage::MenuSub(SubMenu::Doors) => "menu-doors",
            Stage::MenuSub(SubMenu::Users) => "menu-users",
            Stage::MenuSub(SubMenu::Help) => "menu-help",
            Stage::GameActive(_) => "game-active",
            Stage::Disconnecting => "disconnecting",
        }
    }
}
