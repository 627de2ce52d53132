//! JSON output format, including the REST row representation

use std::io::Write;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::access::RowLocator;
use crate::codec::{self, CodecError, WireValue};
use crate::model::{EntityId, Row, TableLayout};

use super::OutputFormatter;

/// JSON output formatter
pub struct JsonOutput {
    pretty: bool,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }

    fn write<T: Serialize>(&self, value: &T, writer: &mut dyn Write) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, value)?;
        } else {
            serde_json::to_writer(&mut *writer, value)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// A row as sent over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestRow {
    /// Hex row key
    pub entity_id: String,
    pub cells: Vec<RestCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestCell {
    pub column_family: String,
    pub column_qualifier: String,
    pub timestamp: u64,
    pub value: WireValue,
}

impl RestRow {
    /// Encode every cell of `row` under its schema
    pub fn from_row(row: &Row) -> Result<Self, CodecError> {
        let cells = row
            .cells
            .iter()
            .map(|cell| {
                Ok(RestCell {
                    column_family: cell.family().to_string(),
                    column_qualifier: cell.qualifier().to_string(),
                    timestamp: cell.timestamp.get(),
                    value: codec::encode(&cell.value, &cell.schema)?,
                })
            })
            .collect::<Result<_, CodecError>>()?;
        Ok(Self {
            entity_id: row.entity_id.to_hex(),
            cells,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonLocator<'a> {
    table: &'a str,
    entity_id: String,
    location: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonEntityId {
    entity_id: String,
}

impl OutputFormatter for JsonOutput {
    fn render_row(&self, row: &Row, writer: &mut dyn Write) -> Result<()> {
        self.write(&RestRow::from_row(row)?, writer)
    }

    fn render_locator(&self, locator: &RowLocator, instance: &str, writer: &mut dyn Write) -> Result<()> {
        self.write(
            &JsonLocator {
                table: &locator.table,
                entity_id: locator.entity_id.to_hex(),
                location: locator.path(instance),
            },
            writer,
        )
    }

    fn render_layout(&self, layout: &TableLayout, writer: &mut dyn Write) -> Result<()> {
        self.write(layout, writer)
    }

    fn render_entity_id(&self, entity_id: &EntityId, writer: &mut dyn Write) -> Result<()> {
        self.write(
            &JsonEntityId {
                entity_id: entity_id.to_hex(),
            },
            writer,
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{Cell, CellSchema, CellValue, Coordinate, Timestamp};

    #[test]
    fn test_rest_row_shape() {
        let row = Row::new(
            EntityId::new(b"row".to_vec()),
            vec![
                Cell {
                    coordinate: Coordinate::new("longs", "some_qualifier"),
                    timestamp: Timestamp::new(2),
                    value: CellValue::Long(1000),
                    schema: CellSchema::Long,
                },
                Cell {
                    coordinate: Coordinate::new("strings", "a"),
                    timestamp: Timestamp::new(1),
                    value: CellValue::from("x"),
                    schema: CellSchema::String,
                },
            ],
        );
        let mut out = Vec::new();
        JsonOutput::compact().render_row(&row, &mut out).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            parsed,
            json!({
                "entityId": "726f77",
                "cells": [
                    {"columnFamily": "longs", "columnQualifier": "some_qualifier", "timestamp": 2, "value": 1000},
                    {"columnFamily": "strings", "columnQualifier": "a", "timestamp": 1, "value": "x"}
                ]
            })
        );
    }
}
