//! Row reads: resolve columns, fetch and filter versions, decode cells

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::{check_compatible, decode_cell, resolve};
use crate::error::RowError;
use crate::model::{Cell, CellSchema, Coordinate, EntityId, Row, TableLayout, Timestamped};
use crate::query::{filter_versions, resolve_column, resolve_columns, ColumnSpec, ReadQuery, VersionLimit};
use crate::store::TableHandle;

pub struct RowReader<'a> {
    table: &'a dyn TableHandle,
    layout: Arc<TableLayout>,
}

impl<'a> RowReader<'a> {
    pub fn new(table: &'a dyn TableHandle) -> Self {
        Self {
            layout: table.layout(),
            table,
        }
    }

    /// Read one row
    ///
    /// `default_versions` caps versions when the query does not.
    pub fn read(
        &self,
        entity_id: &EntityId,
        query: &ReadQuery,
        default_versions: VersionLimit,
    ) -> Result<Row, RowError> {
        let specs = resolve_columns(&query.columns, &self.layout)?;
        let limit = query.versions.unwrap_or(default_versions);
        let coordinates = self.expand(entity_id, &specs)?;

        let mut cells = Vec::new();
        for coordinate in &coordinates {
            let reader_schema = self.reader_schema(coordinate, query)?;
            let stored = self.table.get_versions(
                entity_id,
                &coordinate.family,
                &coordinate.qualifier,
                limit,
                query.range,
            )?;
            let stored_count = stored.len();
            let kept = filter_versions(stored, query.range, limit);
            debug!(
                %coordinate,
                stored = stored_count,
                kept = kept.len(),
                "resolved coordinate"
            );
            for version in kept {
                cells.push(decode_version(coordinate, version, &reader_schema)?);
            }
        }

        if cells.is_empty() && !self.row_exists(entity_id)? {
            return Err(RowError::RowNotFound {
                entity_id: entity_id.clone(),
            });
        }
        Ok(Row::new(entity_id.clone(), cells))
    }

    /// Concrete coordinates in row order, without duplicates
    fn expand(&self, entity_id: &EntityId, specs: &[ColumnSpec]) -> Result<Vec<Coordinate>, RowError> {
        let mut keyed: Vec<(usize, Coordinate)> = Vec::new();
        for spec in specs {
            match spec {
                ColumnSpec::Column(coordinate) => {
                    keyed.push((self.family_index(&coordinate.family), coordinate.clone()))
                }
                ColumnSpec::AllQualifiers { family } => {
                    let index = self.family_index(family);
                    for qualifier in self.table.list_qualifiers(entity_id, family)? {
                        if self.layout.cell_schema(family, &qualifier).is_none() {
                            warn!(family = %family, qualifier = %qualifier, "skipping undeclared qualifier");
                            continue;
                        }
                        keyed.push((index, Coordinate::new(family.as_str(), qualifier)));
                    }
                }
            }
        }
        keyed.sort();
        keyed.dedup();
        Ok(keyed.into_iter().map(|(_, c)| c).collect())
    }

    fn family_index(&self, family: &str) -> usize {
        self.layout.family_index(family).unwrap_or(usize::MAX)
    }

    /// Schema cells of `coordinate` are returned in
    fn reader_schema(&self, coordinate: &Coordinate, query: &ReadQuery) -> Result<Cow<'_, CellSchema>, RowError> {
        let declared = resolve_column(&coordinate.family, &coordinate.qualifier, &self.layout)?;
        match query.reader_schemas.get(coordinate) {
            None => Ok(Cow::Borrowed(declared)),
            Some(json) => {
                let schema = CellSchema::parse(json).map_err(|source| RowError::Schema {
                    coordinate: coordinate.clone(),
                    source,
                })?;
                debug!(%coordinate, schema = %schema, "reader schema override");
                Ok(Cow::Owned(schema))
            }
        }
    }

    fn row_exists(&self, entity_id: &EntityId) -> Result<bool, RowError> {
        for family in &self.layout.families {
            if !self.table.list_qualifiers(entity_id, family.name())?.is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn decode_version(
    coordinate: &Coordinate,
    version: Timestamped<Vec<u8>>,
    reader_schema: &CellSchema,
) -> Result<Cell, RowError> {
    let codec_error = |source| RowError::Codec {
        coordinate: coordinate.clone(),
        source,
    };
    let (writer_schema, value) = decode_cell(&version.value).map_err(codec_error)?;
    check_compatible(&writer_schema, reader_schema).map_err(|source| RowError::Schema {
        coordinate: coordinate.clone(),
        source,
    })?;
    let value = resolve(value, &writer_schema, reader_schema).map_err(codec_error)?;
    Ok(Cell {
        coordinate: coordinate.clone(),
        timestamp: version.ts,
        value,
        schema: reader_schema.clone(),
    })
}
