//! JSON snapshots of an in-memory store
//!
//! ```json
//! {"tables": [{
//!   "layout": { ... },
//!   "cells": [{"row": "<hex>", "family": "info", "qualifier": "name",
//!              "versions": [{"timestamp": 5, "value": "<hex>"}]}]
//! }]}
//! ```

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{EntityId, TableLayout, Timestamp};

use super::memory::InMemoryStore;
use super::{StoreError, TableHandle};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    tables: Vec<TableSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableSnapshot {
    layout: TableLayout,
    #[serde(default)]
    cells: Vec<CellSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CellSnapshot {
    row: EntityId,
    family: String,
    qualifier: String,
    versions: Vec<VersionSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionSnapshot {
    timestamp: Timestamp,
    /// Stored cell bytes, hex
    value: String,
}

/// Write every table of `store` as JSON
pub fn to_writer(store: &InMemoryStore, writer: impl Write) -> Result<(), StoreError> {
    let mut snapshot = Snapshot::default();
    for table in store.tables()? {
        let cells = table
            .dump()?
            .into_iter()
            .map(|cell| CellSnapshot {
                row: cell.row,
                family: cell.family,
                qualifier: cell.qualifier,
                versions: cell
                    .versions
                    .into_iter()
                    .map(|v| VersionSnapshot {
                        timestamp: v.ts,
                        value: hex::encode(v.value),
                    })
                    .collect(),
            })
            .collect();
        snapshot.tables.push(TableSnapshot {
            layout: (*table.layout()).clone(),
            cells,
        });
    }
    serde_json::to_writer_pretty(writer, &snapshot).map_err(|e| StoreError::Snapshot(e.to_string()))
}

/// Rebuild a store from JSON written by [`to_writer`]
pub fn from_reader(reader: impl Read) -> Result<InMemoryStore, StoreError> {
    let snapshot: Snapshot =
        serde_json::from_reader(reader).map_err(|e| StoreError::Snapshot(e.to_string()))?;
    let store = InMemoryStore::new();
    for TableSnapshot { layout, cells } in snapshot.tables {
        layout
            .validate()
            .map_err(|e| StoreError::Snapshot(e.to_string()))?;
        let table = store.insert_table(layout)?;
        let layout = table.layout();
        for cell in cells {
            if layout.family(&cell.family).is_none() {
                return Err(StoreError::Snapshot(format!(
                    "table '{}' has no family '{}'",
                    layout.name, cell.family
                )));
            }
            for version in cell.versions {
                let bytes = hex::decode(&version.value).map_err(|e| {
                    StoreError::Snapshot(format!(
                        "bad value at {}:{} of row {}: {}",
                        cell.family, cell.qualifier, cell.row, e
                    ))
                })?;
                table.put(&cell.row, &cell.family, &cell.qualifier, version.timestamp, bytes)?;
            }
        }
    }
    Ok(store)
}

/// Save `store` to `path`
pub fn save(store: &InMemoryStore, path: &Path) -> Result<(), StoreError> {
    let mut buf = Vec::new();
    to_writer(store, &mut buf)?;
    buf.push(b'\n');
    fs::write(path, buf)?;
    Ok(())
}

/// Load a store from `path`
pub fn load(path: &Path) -> Result<InMemoryStore, StoreError> {
    from_reader(fs::File::open(path)?)
}
