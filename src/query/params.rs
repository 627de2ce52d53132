//! Query-string parameters of row reads and writes
//!
//! Reads understand `cols`, `versions`, `timerange` and
//! `schema.family:qualifier`; anything else is ignored. Writes take
//! `family:qualifier=value` pairs plus `timestamp`,
//! `timestamp.family:qualifier` and `schema.family:qualifier`.

use indexmap::IndexMap;
use url::form_urlencoded;

use crate::error::RowError;
use crate::model::{Coordinate, Timestamp};

use super::columns::ColumnRequest;
use super::time::{TimeRange, VersionLimit};

const COLS: &str = "cols";
const VERSIONS: &str = "versions";
const TIMERANGE: &str = "timerange";
const TIMESTAMP: &str = "timestamp";
const TIMESTAMP_PREFIX: &str = "timestamp.";
const SCHEMA_PREFIX: &str = "schema.";

/// Insert `key=value`, tolerating exact repeats and rejecting conflicting ones
fn insert_once<K>(
    map: &mut IndexMap<K, String>,
    key: K,
    value: &str,
    param: impl FnOnce() -> String,
) -> Result<(), RowError>
where
    K: std::hash::Hash + Eq,
{
    match map.get(&key) {
        Some(existing) if existing != value => Err(RowError::invalid_parameter(
            param(),
            "given more than once with different values",
        )),
        Some(_) => Ok(()),
        None => {
            map.insert(key, value.to_string());
            Ok(())
        }
    }
}

/// Parameters of a row read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadQuery {
    /// Requested columns; empty means the whole row
    pub columns: Vec<ColumnRequest>,
    /// Version cap; `None` falls back to the configured default
    pub versions: Option<VersionLimit>,
    pub range: TimeRange,
    /// Reader schema JSON per coordinate
    pub reader_schemas: IndexMap<Coordinate, String>,
}

impl ReadQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string
    pub fn from_query_string(query: &str) -> Result<Self, RowError> {
        let mut read = ReadQuery::new();
        let mut versions = None;
        let mut range = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                COLS => {
                    for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                        if token != "*" {
                            read.columns.push(token.parse()?);
                        }
                    }
                }
                VERSIONS => set_once(&mut versions, VERSIONS, &value)?,
                TIMERANGE => set_once(&mut range, TIMERANGE, &value)?,
                k if k.starts_with(SCHEMA_PREFIX) => {
                    let column = &k[SCHEMA_PREFIX.len()..];
                    let coordinate = Coordinate::parse(column).ok_or_else(|| {
                        RowError::invalid_parameter(k, "expected schema.family:qualifier")
                    })?;
                    insert_once(&mut read.reader_schemas, coordinate, &value, || k.to_string())?;
                }
                _ => {}
            }
        }
        if let Some(v) = versions {
            read.versions = Some(
                v.parse()
                    .map_err(|reason: String| RowError::invalid_parameter(VERSIONS, reason))?,
            );
        }
        if let Some(r) = range {
            read.range = r
                .parse()
                .map_err(|reason: String| RowError::invalid_parameter(TIMERANGE, reason))?;
        }
        Ok(read)
    }

    pub fn with_column(mut self, column: ColumnRequest) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_versions(mut self, versions: VersionLimit) -> Self {
        self.versions = Some(versions);
        self
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_reader_schema(mut self, coordinate: Coordinate, schema_json: impl Into<String>) -> Self {
        self.reader_schemas.insert(coordinate, schema_json.into());
        self
    }
}

fn set_once(slot: &mut Option<String>, name: &str, value: &str) -> Result<(), RowError> {
    match slot {
        Some(existing) if existing != value => Err(RowError::invalid_parameter(
            name,
            "given more than once with different values",
        )),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value.to_string());
            Ok(())
        }
    }
}

/// A write waiting to be validated
///
/// Everything is kept as raw text: values are decoded against their schema
/// by the writer, and overrides are only looked at when a value for the same
/// coordinate is being written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingWrite {
    pub timestamp: Option<String>,
    pub values: IndexMap<Coordinate, String>,
    /// `timestamp.<column>` overrides keyed by the raw column text
    pub timestamps: IndexMap<String, String>,
    /// `schema.<column>` overrides keyed by the raw column text
    pub schemas: IndexMap<String, String>,
}

impl PendingWrite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` write payload
    pub fn from_query_string(query: &str) -> Result<Self, RowError> {
        let mut write = PendingWrite::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            write.insert_param(&key, &value)?;
        }
        Ok(write)
    }

    /// Add one `key=value` parameter
    pub fn insert_param(&mut self, key: &str, value: &str) -> Result<(), RowError> {
        if key == TIMESTAMP {
            return set_once(&mut self.timestamp, TIMESTAMP, value);
        }
        if let Some(column) = key.strip_prefix(TIMESTAMP_PREFIX) {
            return insert_once(&mut self.timestamps, column.to_string(), value, || key.to_string());
        }
        if let Some(column) = key.strip_prefix(SCHEMA_PREFIX) {
            return insert_once(&mut self.schemas, column.to_string(), value, || key.to_string());
        }
        match key.parse::<ColumnRequest>()? {
            ColumnRequest::Column { family, qualifier } => {
                insert_once(&mut self.values, Coordinate::new(family, qualifier), value, || {
                    key.to_string()
                })
            }
            ColumnRequest::Family(_) => Err(RowError::invalid_parameter(
                key,
                "writes need a family:qualifier column",
            )),
        }
    }

    pub fn with_timestamp(mut self, ts: Timestamp) -> Self {
        self.timestamp = Some(ts.to_string());
        self
    }

    pub fn with_value(mut self, coordinate: Coordinate, text: impl Into<String>) -> Self {
        self.values.insert(coordinate, text.into());
        self
    }

    pub fn with_timestamp_override(mut self, column: impl Into<String>, ts: Timestamp) -> Self {
        self.timestamps.insert(column.into(), ts.to_string());
        self
    }

    pub fn with_schema_override(mut self, column: impl Into<String>, schema_json: impl Into<String>) -> Self {
        self.schemas.insert(column.into(), schema_json.into());
        self
    }

    /// Parsed default timestamp
    pub fn default_timestamp(&self) -> Result<Timestamp, RowError> {
        let raw = self.timestamp.as_deref().ok_or(RowError::MissingTimestamp)?;
        raw.parse()
            .map_err(|_| RowError::invalid_parameter(TIMESTAMP, format!("'{}' is not a timestamp", raw)))
    }

    /// Timestamp for `coordinate`: its override if given, else `default`
    pub fn timestamp_for(&self, coordinate: &Coordinate, default: Timestamp) -> Result<Timestamp, RowError> {
        match self.timestamps.get(&coordinate.to_string()) {
            Some(raw) => raw.parse().map_err(|_| {
                RowError::invalid_parameter(
                    format!("{}{}", TIMESTAMP_PREFIX, coordinate),
                    format!("'{}' is not a timestamp", raw),
                )
            }),
            None => Ok(default),
        }
    }

    /// Writer schema JSON overriding the declared schema of `coordinate`
    pub fn schema_for(&self, coordinate: &Coordinate) -> Option<&str> {
        self.schemas.get(&coordinate.to_string()).map(String::as_str)
    }

    /// Override columns with no value to write
    pub fn inert_overrides(&self) -> impl Iterator<Item = String> + '_ {
        let unwritten = |column: &&String| {
            !self
                .values
                .keys()
                .any(|c| c.to_string() == column.as_str())
        };
        self.timestamps
            .keys()
            .filter(unwritten)
            .map(|c| format!("{}{}", TIMESTAMP_PREFIX, c))
            .chain(
                self.schemas
                    .keys()
                    .filter(unwritten)
                    .map(|c| format!("{}{}", SCHEMA_PREFIX, c)),
            )
    }
}
