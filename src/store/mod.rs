//! Storage layer: versioned cells addressed by row, family, qualifier and timestamp

mod memory;
pub mod snapshot;

use std::sync::Arc;

use serde_json::Value;

use crate::model::{EntityId, EntityIdError, TableLayout, Timestamp, Timestamped};
use crate::query::{TimeRange, VersionLimit};

pub use memory::InMemoryStore;

/// Errors raised by a table store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("table '{0}' does not exist")]
    TableNotFound(String),
    #[error("table '{0}' already exists")]
    TableExists(String),
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("bad snapshot: {0}")]
    Snapshot(String),
}

/// A collection of tables
pub trait TableStore: Send + Sync {
    /// Open a table by name
    fn open_table(&self, name: &str) -> Result<Arc<dyn TableHandle>, StoreError>;
}

/// One open table
///
/// `max_versions` and `range` on reads are hints: a store may return more
/// than asked for, and callers filter again.
pub trait TableHandle: Send + Sync {
    fn layout(&self) -> Arc<TableLayout>;

    /// Stored versions of one coordinate, newest first
    fn get_versions(
        &self,
        row: &EntityId,
        family: &str,
        qualifier: &str,
        max_versions: VersionLimit,
        range: TimeRange,
    ) -> Result<Vec<Timestamped<Vec<u8>>>, StoreError>;

    /// Qualifiers holding at least one version in `family`, sorted
    fn list_qualifiers(&self, row: &EntityId, family: &str) -> Result<Vec<String>, StoreError>;

    /// Store one version; an existing version at the same timestamp is replaced
    fn put(
        &self,
        row: &EntityId,
        family: &str,
        qualifier: &str,
        timestamp: Timestamp,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError>;

    /// Entity id for row key components, per the layout's row key format
    fn entity_id_from_components(&self, components: &[Value]) -> Result<EntityId, EntityIdError> {
        self.layout().row_key.entity_id(components)
    }
}
