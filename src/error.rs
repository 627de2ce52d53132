//! Request errors

use crate::codec::CodecError;
use crate::model::{Coordinate, EntityId, SchemaError};
use crate::store::StoreError;

/// How an error should be reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was malformed or named something that cannot exist
    Client,
    /// The request was well formed but its target does not exist
    NotFound,
    /// The store failed
    Server,
}

/// Errors returned by row reads and writes
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("unknown column '{column}'")]
    UnknownColumn { column: String },

    #[error("row {entity_id} not found")]
    RowNotFound { entity_id: EntityId },

    #[error("a default 'timestamp' is required for writes")]
    MissingTimestamp,

    #[error("cannot convert value of {coordinate}: {source}")]
    Codec {
        coordinate: Coordinate,
        #[source]
        source: CodecError,
    },

    #[error("schema error for {coordinate}: {source}")]
    Schema {
        coordinate: Coordinate,
        #[source]
        source: SchemaError,
    },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RowError {
    pub fn unknown_column(column: impl Into<String>) -> Self {
        RowError::UnknownColumn {
            column: column.into(),
        }
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        RowError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RowError::RowNotFound { .. } | RowError::Store(StoreError::TableNotFound(_)) => {
                ErrorKind::NotFound
            }
            RowError::Store(_) => ErrorKind::Server,
            _ => ErrorKind::Client,
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Client => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Server => 500,
        }
    }
}
