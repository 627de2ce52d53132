//! Row writes: validate and encode every cell, then store them

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::codec::{check_compatible, decode_text, encode_cell};
use crate::error::RowError;
use crate::model::{CellSchema, Coordinate, EntityId, TableLayout, Timestamp};
use crate::query::{resolve_column, PendingWrite};
use crate::store::TableHandle;

/// Where a written row can be read back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowLocator {
    pub table: String,
    #[serde(rename = "entityId")]
    pub entity_id: EntityId,
}

impl RowLocator {
    /// Resource path of the row within `instance`
    pub fn path(&self, instance: &str) -> String {
        format!(
            "/v1/instances/{}/tables/{}/rows/{}",
            instance,
            self.table,
            self.entity_id.to_hex()
        )
    }
}

impl fmt::Display for RowLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table, self.entity_id)
    }
}

/// A cell ready to be stored
struct PreparedCell<'w> {
    coordinate: &'w Coordinate,
    timestamp: Timestamp,
    bytes: Vec<u8>,
}

pub struct RowWriter<'a> {
    table: &'a dyn TableHandle,
    layout: Arc<TableLayout>,
}

impl<'a> RowWriter<'a> {
    pub fn new(table: &'a dyn TableHandle) -> Self {
        Self {
            layout: table.layout(),
            table,
        }
    }

    /// Write every value of `write` to one row
    ///
    /// Nothing is stored unless every cell resolves, decodes and encodes.
    /// Cells are then put one at a time.
    pub fn write(&self, entity_id: &EntityId, write: &PendingWrite) -> Result<RowLocator, RowError> {
        let default_ts = write.default_timestamp()?;
        for param in write.inert_overrides() {
            debug!(%param, "override has no value to write, ignored");
        }

        let prepared = write
            .values
            .iter()
            .map(|(coordinate, text)| self.prepare(coordinate, text, write, default_ts))
            .collect::<Result<Vec<_>, _>>()?;

        for cell in prepared {
            self.table.put(
                entity_id,
                &cell.coordinate.family,
                &cell.coordinate.qualifier,
                cell.timestamp,
                cell.bytes,
            )?;
        }
        Ok(RowLocator {
            table: self.layout.name.clone(),
            entity_id: entity_id.clone(),
        })
    }

    fn prepare<'w>(
        &self,
        coordinate: &'w Coordinate,
        text: &str,
        write: &PendingWrite,
        default_ts: Timestamp,
    ) -> Result<PreparedCell<'w>, RowError> {
        let declared = resolve_column(&coordinate.family, &coordinate.qualifier, &self.layout)?;
        let schema_error = |source| RowError::Schema {
            coordinate: coordinate.clone(),
            source,
        };
        let writer_schema = match write.schema_for(coordinate) {
            Some(json) => {
                let schema = CellSchema::parse(json).map_err(schema_error)?;
                check_compatible(&schema, declared).map_err(schema_error)?;
                Cow::Owned(schema)
            }
            None => Cow::Borrowed(declared),
        };
        let timestamp = write.timestamp_for(coordinate, default_ts)?;

        let codec_error = |source| RowError::Codec {
            coordinate: coordinate.clone(),
            source,
        };
        let value = decode_text(text, &writer_schema).map_err(codec_error)?;
        let bytes = encode_cell(&value, &writer_schema).map_err(codec_error)?;
        debug!(
            %coordinate,
            %timestamp,
            timestamp_override = write.timestamps.contains_key(&coordinate.to_string()),
            schema_override = matches!(writer_schema, Cow::Owned(_)),
            "accepted cell"
        );
        Ok(PreparedCell {
            coordinate,
            timestamp,
            bytes,
        })
    }
}
