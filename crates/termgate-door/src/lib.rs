//! Door games for Termgate.
//!
//! A door is a self-contained game a logged-in user steps into from the
//! door menu. While a door is active the session forwards every sanitized
//! input line to it and wraps whatever it answers into the session's frame
//! format. When the door reports `done`, the user is back at the main menu.
//!
//! # Key types
//!
//! - [`DoorGame`]: the trait a door implements
//! - [`DoorOutput`]: what a door answers to each line
//! - [`DoorCatalog`]: registry of doors by id, in menu order
//! - [`HiLo`]: the built-in Hi-Lo Casino number-guessing door

mod catalog;
mod error;
mod game;
mod hilo;

pub use catalog::{DoorCatalog, DoorInfo};
pub use error::DoorError;
pub use game::{DoorGame, DoorId, DoorOutput};
pub use hilo::{HiLo, HiLoConfig};
