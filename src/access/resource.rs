//! The row resource: one row of one table, read and written by entity id

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::error::{ErrorKind, RowError};
use crate::model::{EntityId, Row, TableLayout};
use crate::query::{PendingWrite, ReadQuery, VersionLimit};
use crate::store::{TableHandle, TableStore};

use super::reader::RowReader;
use super::writer::{RowLocator, RowWriter};

/// Entry point for row requests against a table store
pub struct RowResource {
    store: Arc<dyn TableStore>,
    instance: String,
    default_versions: VersionLimit,
}

impl RowResource {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self::with_config(store, &Config::default())
    }

    pub fn with_config(store: Arc<dyn TableStore>, config: &Config) -> Self {
        Self {
            store,
            instance: config.instance.clone(),
            default_versions: config.default_versions,
        }
    }

    /// Instance name used in row locators
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Read a row; `entity_id` is hex
    #[instrument(name = "row_request", skip(self, query), fields(op = "get"))]
    pub fn get_row(&self, table: &str, entity_id: &str, query: &ReadQuery) -> Result<Row, RowError> {
        let result = self.open(table, entity_id).and_then(|(handle, entity_id)| {
            RowReader::new(handle.as_ref()).read(&entity_id, query, self.default_versions)
        });
        match &result {
            Ok(row) => info!(cells = row.cell_count(), "row read"),
            Err(e) => report(e),
        }
        result
    }

    /// Read a row with query-string parameters
    pub fn get_row_with_params(&self, table: &str, entity_id: &str, params: &str) -> Result<Row, RowError> {
        let query = ReadQuery::from_query_string(params).inspect_err(report)?;
        self.get_row(table, entity_id, &query)
    }

    /// Write cells to a row; `entity_id` is hex
    #[instrument(name = "row_request", skip(self, write), fields(op = "put"))]
    pub fn put_row(
        &self,
        table: &str,
        entity_id: &str,
        write: &PendingWrite,
    ) -> Result<RowLocator, RowError> {
        let result = self
            .open(table, entity_id)
            .and_then(|(handle, entity_id)| RowWriter::new(handle.as_ref()).write(&entity_id, write));
        match &result {
            Ok(locator) => info!(
                cells = write.values.len(),
                location = %locator.path(&self.instance),
                "row written"
            ),
            Err(e) => report(e),
        }
        result
    }

    /// Write cells given as a query string
    pub fn put_row_with_params(
        &self,
        table: &str,
        entity_id: &str,
        params: &str,
    ) -> Result<RowLocator, RowError> {
        let write = PendingWrite::from_query_string(params).inspect_err(report)?;
        self.put_row(table, entity_id, &write)
    }

    /// Entity id of row key components given as JSON
    ///
    /// Accepts an array of components, or a single bare component.
    pub fn entity_id(&self, table: &str, components: &str) -> Result<EntityId, RowError> {
        let handle = self.store.open_table(table)?;
        let parsed: Value = serde_json::from_str(components)
            .map_err(|e| RowError::invalid_parameter("components", e.to_string()))?;
        let values = match parsed {
            Value::Array(values) => values,
            single => vec![single],
        };
        handle
            .entity_id_from_components(&values)
            .map_err(|e| RowError::invalid_parameter("components", e.to_string()))
    }

    pub fn layout(&self, table: &str) -> Result<Arc<TableLayout>, RowError> {
        Ok(self.store.open_table(table)?.layout())
    }

    fn open(&self, table: &str, entity_id: &str) -> Result<(Arc<dyn TableHandle>, EntityId), RowError> {
        let handle = self.store.open_table(table)?;
        let entity_id = EntityId::from_hex(entity_id)
            .map_err(|e| RowError::invalid_parameter("entityId", e.to_string()))?;
        Ok((handle, entity_id))
    }
}

fn report(e: &RowError) {
    match e.kind() {
        ErrorKind::Server => error!(error = %e, "row request failed"),
        ErrorKind::Client | ErrorKind::NotFound => {
            warn!(error = %e, status = e.status_code(), "row request rejected")
        }
    }
}
