//! In-memory table store

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::model::{EntityId, TableLayout, Timestamp, Timestamped};
use crate::query::{TimeRange, VersionLimit};

use super::{StoreError, TableHandle, TableStore};

/// Row key, family, qualifier
type CellKey = (Vec<u8>, String, String);

/// Versions of one coordinate, iterated newest first
type Versions = BTreeMap<Reverse<Timestamp>, Vec<u8>>;

/// Versions of one coordinate as held in a snapshot
pub(crate) struct StoredCell {
    pub row: EntityId,
    pub family: String,
    pub qualifier: String,
    pub versions: Vec<Timestamped<Vec<u8>>>,
}

/// Tables held in memory, each guarded by its own lock
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<BTreeMap<String, Arc<MemoryTable>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with `layout`
    pub fn create_table(&self, layout: TableLayout) -> Result<Arc<dyn TableHandle>, StoreError> {
        let table: Arc<dyn TableHandle> = self.insert_table(layout)?;
        Ok(table)
    }

    pub(crate) fn insert_table(&self, layout: TableLayout) -> Result<Arc<MemoryTable>, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        if tables.contains_key(&layout.name) {
            return Err(StoreError::TableExists(layout.name));
        }
        let name = layout.name.clone();
        let table = Arc::new(MemoryTable::new(layout));
        tables.insert(name, Arc::clone(&table));
        Ok(table)
    }

    pub(crate) fn tables(&self) -> Result<Vec<Arc<MemoryTable>>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.values().cloned().collect())
    }
}

impl TableStore for InMemoryStore {
    fn open_table(&self, name: &str) -> Result<Arc<dyn TableHandle>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        let table = tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;
        Ok(Arc::clone(table) as Arc<dyn TableHandle>)
    }
}

pub(crate) struct MemoryTable {
    layout: Arc<TableLayout>,
    cells: RwLock<BTreeMap<CellKey, Versions>>,
}

impl MemoryTable {
    fn new(layout: TableLayout) -> Self {
        Self {
            layout: Arc::new(layout),
            cells: RwLock::new(BTreeMap::new()),
        }
    }

    /// Every stored coordinate with its versions, in key order
    pub(crate) fn dump(&self) -> Result<Vec<StoredCell>, StoreError> {
        let cells = self.cells.read().map_err(|_| StoreError::Poisoned)?;
        Ok(cells
            .iter()
            .map(|((row, family, qualifier), versions)| StoredCell {
                row: EntityId::new(row.clone()),
                family: family.clone(),
                qualifier: qualifier.clone(),
                versions: versions
                    .iter()
                    .map(|(Reverse(ts), bytes)| Timestamped::new(bytes.clone(), *ts))
                    .collect(),
            })
            .collect())
    }
}

impl TableHandle for MemoryTable {
    fn layout(&self) -> Arc<TableLayout> {
        Arc::clone(&self.layout)
    }

    fn get_versions(
        &self,
        row: &EntityId,
        family: &str,
        qualifier: &str,
        max_versions: VersionLimit,
        range: TimeRange,
    ) -> Result<Vec<Timestamped<Vec<u8>>>, StoreError> {
        let cells = self.cells.read().map_err(|_| StoreError::Poisoned)?;
        let key = (row.as_bytes().to_vec(), family.to_string(), qualifier.to_string());
        let Some(versions) = cells.get(&key) else {
            trace!(table = %self.layout.name, %row, family, qualifier, "no versions");
            return Ok(Vec::new());
        };
        let found: Vec<_> = versions
            .iter()
            .filter(|(Reverse(ts), _)| range.contains(*ts))
            .take(max_versions.get().unwrap_or(usize::MAX))
            .map(|(Reverse(ts), bytes)| Timestamped::new(bytes.clone(), *ts))
            .collect();
        trace!(
            table = %self.layout.name,
            %row,
            family,
            qualifier,
            stored = versions.len(),
            returned = found.len(),
            "read versions"
        );
        Ok(found)
    }

    fn list_qualifiers(&self, row: &EntityId, family: &str) -> Result<Vec<String>, StoreError> {
        let cells = self.cells.read().map_err(|_| StoreError::Poisoned)?;
        let start = (row.as_bytes().to_vec(), family.to_string(), String::new());
        Ok(cells
            .range(start..)
            .take_while(|((r, f, _), _)| r.as_slice() == row.as_bytes() && f == family)
            .filter(|(_, versions)| !versions.is_empty())
            .map(|((_, _, q), _)| q.clone())
            .collect())
    }

    fn put(
        &self,
        row: &EntityId,
        family: &str,
        qualifier: &str,
        timestamp: Timestamp,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        let mut cells = self.cells.write().map_err(|_| StoreError::Poisoned)?;
        trace!(
            table = %self.layout.name,
            %row,
            family,
            qualifier,
            %timestamp,
            len = bytes.len(),
            "put"
        );
        cells
            .entry((row.as_bytes().to_vec(), family.to_string(), qualifier.to_string()))
            .or_default()
            .insert(Reverse(timestamp), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellSchema, FamilyLayout, RowKeyFormat};

    fn store() -> (InMemoryStore, Arc<dyn TableHandle>) {
        let layout = TableLayout::new(
            "t",
            RowKeyFormat::Raw,
            vec![FamilyLayout::Map {
                name: "m".into(),
                schema: CellSchema::Long,
            }],
        )
        .unwrap();
        let store = InMemoryStore::new();
        let table = store.create_table(layout).unwrap();
        (store, table)
    }

    #[test]
    fn test_versions_newest_first() {
        let (_store, table) = store();
        let row = EntityId::new(b"r".to_vec());
        for ts in [3u64, 1, 5, 2, 4] {
            table.put(&row, "m", "q", ts.into(), vec![ts as u8]).unwrap();
        }
        // Same timestamp replaces
        table.put(&row, "m", "q", 4.into(), vec![40]).unwrap();

        let all = table
            .get_versions(&row, "m", "q", VersionLimit::All, TimeRange::ALL)
            .unwrap();
        let stamps: Vec<u64> = all.iter().map(|v| v.ts.get()).collect();
        assert_eq!(stamps, [5, 4, 3, 2, 1]);
        assert_eq!(all[1].value, vec![40]);

        let hinted = table
            .get_versions(&row, "m", "q", VersionLimit::ONE, "2..4".parse().unwrap())
            .unwrap();
        assert_eq!(hinted.len(), 1);
        assert_eq!(hinted[0].ts, Timestamp::new(3));
    }

    #[test]
    fn test_list_qualifiers_stays_in_row() {
        let (_store, table) = store();
        let a = EntityId::new(b"a".to_vec());
        let ab = EntityId::new(b"ab".to_vec());
        table.put(&a, "m", "z", 1.into(), vec![]).unwrap();
        table.put(&a, "m", "b:c", 1.into(), vec![]).unwrap();
        table.put(&ab, "m", "x", 1.into(), vec![]).unwrap();
        assert_eq!(table.list_qualifiers(&a, "m").unwrap(), ["b:c", "z"]);
        assert!(table.list_qualifiers(&a, "other").unwrap().is_empty());
    }

    #[test]
    fn test_open_table() {
        let (store, _table) = store();
        assert!(store.open_table("t").is_ok());
        assert!(matches!(
            store.open_table("missing"),
            Err(StoreError::TableNotFound(name)) if name == "missing"
        ));
        let layout = (*store.open_table("t").unwrap().layout()).clone();
        assert!(matches!(
            store.create_table(layout),
            Err(StoreError::TableExists(_))
        ));
    }
}
