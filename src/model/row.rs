//! Rows, cells, coordinates and timestamps

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::schema::CellSchema;
use super::value::CellValue;

/// Cell timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn new(ts: u64) -> Self {
        Self(ts)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Timestamp {
    fn from(ts: u64) -> Self {
        Self(ts)
    }
}

impl FromStr for Timestamp {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value tagged with the timestamp it was written at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamped<V> {
    pub ts: Timestamp,
    pub value: V,
}

impl<V> Timestamped<V> {
    pub fn new(value: V, ts: Timestamp) -> Self {
        Self { ts, value }
    }
}

/// A (family, qualifier) pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coordinate {
    pub family: String,
    pub qualifier: String,
}

impl Coordinate {
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }

    /// Parse `family:qualifier`, splitting on the first colon
    pub fn parse(token: &str) -> Option<Self> {
        let (family, qualifier) = token.split_once(':')?;
        if family.is_empty() {
            return None;
        }
        Some(Self::new(family, qualifier))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.qualifier)
    }
}

/// One version of one coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub coordinate: Coordinate,
    pub timestamp: Timestamp,
    pub value: CellValue,
    /// Schema `value` conforms to
    pub schema: CellSchema,
}

impl Cell {
    pub fn family(&self) -> &str {
        &self.coordinate.family
    }

    pub fn qualifier(&self) -> &str {
        &self.coordinate.qualifier
    }
}

/// A row: its entity id and cells ordered by family, qualifier, then newest first
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub entity_id: EntityId,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(entity_id: EntityId, cells: Vec<Cell>) -> Self {
        Self { entity_id, cells }
    }

    /// Number of cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}
