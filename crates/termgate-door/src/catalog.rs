//! The door catalog: which doors exist and how to start one.

use std::sync::Arc;

use crate::{DoorError, DoorGame, DoorId, HiLo, HiLoConfig};

type DoorFactory = Arc<dyn Fn() -> Box<dyn DoorGame> + Send + Sync>;

/// What the door menu shows for one door.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorInfo {
    pub id: DoorId,
    pub name: String,
    pub description: String,
}

impl DoorInfo {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: DoorId::new(id),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Registry of doors, kept in registration order so menu numbers are
/// stable.
///
/// The catalog is built once at startup and shared read-only by every
/// session; each [`launch`](DoorCatalog::launch) creates a fresh game.
#[derive(Clone, Default)]
pub struct DoorCatalog {
    entries: Vec<(DoorInfo, DoorFactory)>,
}

impl DoorCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in doors.
    pub fn with_builtin() -> Self {
        let mut catalog = Self::new();
        // A fresh catalog has no ids yet, so this cannot collide.
        let _ = catalog.register(
            DoorInfo::new(
                "hilo",
                "Hi-Lo Casino",
                "Guess the number, bet your credits",
            ),
            || Box::new(HiLo::new(HiLoConfig::default())),
        );
        catalog
    }

    /// Adds a door.
    ///
    /// # Errors
    /// `DuplicateId` if a door with the same id is already registered.
    pub fn register<F>(&mut self, info: DoorInfo, factory: F) -> Result<(), DoorError>
    where
        F: Fn() -> Box<dyn DoorGame> + Send + Sync + 'static,
    {
        if self.get(&info.id).is_some() {
            return Err(DoorError::DuplicateId(info.id));
        }
        tracing::debug!(id = %info.id, name = %info.name, "door registered");
        self.entries.push((info, Arc::new(factory)));
        Ok(())
    }

    /// All doors in menu order.
    pub fn list(&self) -> impl Iterator<Item = &DoorInfo> {
        self.entries.iter().map(|(info, _)| info)
    }

    pub fn get(&self, id: &DoorId) -> Option<&DoorInfo> {
        self.list().find(|info| info.id == *id)
    }

    /// The door shown as menu item `number` (1-based).
    pub fn by_number(&self, number: usize) -> Option<&DoorInfo> {
        number
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
            .map(|(info, _)| info)
    }

    /// Creates a new game instance of door `id`.
    pub fn launch(&self, id: &DoorId) -> Result<Box<dyn DoorGame>, DoorError> {
        let (_, factory) = self
            .entries
            .iter()
            .find(|(info, _)| info.id == *id)
            .ok_or_else(|| DoorError::NotFound(id.clone()))?;
        Ok(factory())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for DoorCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.list()).finish()
    }
}
