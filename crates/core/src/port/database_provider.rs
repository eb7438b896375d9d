// Database Provider Port
// Externally registered default handle, consulted when the task has none

use std::sync::RwLock;

/// Source of a fallback database handle
pub trait DatabaseProvider<D>: Send + Sync {
    /// Current default handle, if one was registered
    fn database(&self) -> Option<D>;
}

/// Provider that never supplies a handle
pub struct NoDefaultDatabase;

impl<D> DatabaseProvider<D> for NoDefaultDatabase {
    fn database(&self) -> Option<D> {
        None
    }
}

/// Settable default handle, shared through `Arc`
///
/// Typically filled in by an action attached to the `environment` task.
pub struct DefaultDatabase<D> {
    slot: RwLock<Option<D>>,
}

impl<D> DefaultDatabase<D> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    pub fn with_database(database: D) -> Self {
        Self {
            slot: RwLock::new(Some(database)),
        }
    }

    /// Register `database` as the default, replacing any previous one
    pub fn set(&self, database: D) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(database);
    }

    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn is_defined(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl<D> Default for DefaultDatabase<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> DatabaseProvider<D> for DefaultDatabase<D>
where
    D: Clone + Send + Sync,
{
    fn database(&self) -> Option<D> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
