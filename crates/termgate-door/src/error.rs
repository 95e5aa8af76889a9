//! Error types for the door layer.

use crate::DoorId;

/// Errors that can occur while looking up or launching a door.
#[derive(Debug, thiserror::Error)]
pub enum DoorError {
    /// No door is registered under this id.
    #[error("door {0} not found")]
    NotFound(DoorId),

    /// A door with this id is already registered.
    #[error("door {0} is already registered")]
    DuplicateId(DoorId),
}
