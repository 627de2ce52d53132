//! Column requests and their resolution against a layout

use std::fmt;
use std::str::FromStr;

use crate::error::RowError;
use crate::model::{CellSchema, Coordinate, TableLayout};

/// One requested column token, parsed once at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnRequest {
    /// `family` or `family:`: every stored qualifier of the family
    Family(String),
    /// `family:qualifier`
    Column { family: String, qualifier: String },
}

impl ColumnRequest {
    pub fn family(&self) -> &str {
        match self {
            ColumnRequest::Family(family) | ColumnRequest::Column { family, .. } => family,
        }
    }
}

impl FromStr for ColumnRequest {
    type Err = RowError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (family, qualifier) = match token.split_once(':') {
            Some((family, qualifier)) => (family, Some(qualifier)),
            None => (token, None),
        };
        if family.is_empty() {
            return Err(RowError::unknown_column(token));
        }
        Ok(match qualifier {
            None | Some("") => ColumnRequest::Family(family.to_string()),
            Some(qualifier) => ColumnRequest::Column {
                family: family.to_string(),
                qualifier: qualifier.to_string(),
            },
        })
    }
}

impl fmt::Display for ColumnRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRequest::Family(family) => f.write_str(family),
            ColumnRequest::Column { family, qualifier } => write!(f, "{}:{}", family, qualifier),
        }
    }
}

/// A column request checked against the layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSpec {
    Column(Coordinate),
    /// Expanded against stored data at read time
    AllQualifiers { family: String },
}

/// Resolve requested columns; no requests means every family
pub fn resolve_columns(
    requests: &[ColumnRequest],
    layout: &TableLayout,
) -> Result<Vec<ColumnSpec>, RowError> {
    if requests.is_empty() {
        return Ok(layout
            .families
            .iter()
            .map(|f| ColumnSpec::AllQualifiers {
                family: f.name().to_string(),
            })
            .collect());
    }
    requests
        .iter()
        .map(|request| match request {
            ColumnRequest::Family(family) => {
                layout
                    .family(family)
                    .ok_or_else(|| RowError::unknown_column(request.to_string()))?;
                Ok(ColumnSpec::AllQualifiers {
                    family: family.clone(),
                })
            }
            ColumnRequest::Column { family, qualifier } => {
                resolve_column(family, qualifier, layout)?;
                Ok(ColumnSpec::Column(Coordinate::new(family.as_str(), qualifier.as_str())))
            }
        })
        .collect()
}

/// Declared schema of one coordinate
///
/// Any qualifier resolves in a map family; a group family only knows its
/// declared qualifiers.
pub fn resolve_column<'a>(
    family: &str,
    qualifier: &str,
    layout: &'a TableLayout,
) -> Result<&'a CellSchema, RowError> {
    layout
        .family(family)
        .and_then(|f| f.cell_schema(qualifier))
        .ok_or_else(|| RowError::unknown_column(format!("{}:{}", family, qualifier)))
}
