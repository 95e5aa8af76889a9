//! Per-connection session handling for Termgate.
//!
//! A [`Session`] is the server's record of one connected peer and the
//! state machine that decides what each line of input means:
//!
//! 1. **Gate**: every line is validated for the current [`Stage`] and
//!    admitted by the rate limiter before anything acts on it
//! 2. **Authentication**: username, password, or registration for new
//!    names, backed by the credential store
//! 3. **Menus**: message areas, doors, user list, help, time
//! 4. **Doors**: while a door is active, lines go to the game
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / connection handler (above)  ← owns one Session per connection
//!     ↕
//! Session Layer (this crate)  ← stage machine, returns a ServerFrame per line
//!     ↕
//! Guard, Store, Door, Protocol (below)
//! ```
//!
//! The session does no I/O of its own apart from store calls. The
//! connection handler reads lines, passes them in, and writes back the
//! frames it gets.

mod command;
mod error;
mod screens;
mod session;
mod stage;
mod store_call;

pub use command::{Confirm, DoorsCommand, MainCommand, MessagesCommand};
pub use error::{AuthenticationError, SessionError};
pub use session::{Session, SessionConfig, SessionContext};
pub use stage::{Area, MessageMode, MessageView, RegisterStep, Secret, Stage, SubMenu};
