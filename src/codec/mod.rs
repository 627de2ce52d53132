//! Value codec: typed cell values to and from their wire representation
//!
//! The wire value of a cell is one of three things:
//!
//! 1. a JSON number, for `int`, `long`, `float` and `double` schemas;
//! 2. a plain JSON string, for `string` (and `bytes`/`fixed`) schemas;
//! 3. a JSON string holding a JSON document, for records, enums, arrays,
//!    maps and unions.
//!
//! A string is never sniffed to guess which of these it is: decoding always
//! follows the schema.

mod binary;
mod json;
mod resolve;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::model::{CellSchema, CellValue, SchemaError};

pub use binary::{decode_cell, encode_cell};
pub use json::{from_json, to_json};
pub use resolve::{check_compatible, resolve};

/// Errors converting between values, wire values and stored bytes
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },
    #[error("{literal} is out of range for {schema}")]
    OutOfRange { literal: String, schema: &'static str },
    #[error("non-finite {0} cannot be represented")]
    NonFinite(&'static str),
    #[error("malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("'{symbol}' is not a symbol of enum {name}")]
    UnknownSymbol { symbol: String, name: String },
    #[error("record {record} is missing field '{field}'")]
    MissingField { record: String, field: String },
    #[error("union has no branch '{0}'")]
    UnknownBranch(String),
    #[error("fixed {name} holds {expected} bytes, got {got}")]
    FixedSize {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("character {0:?} does not fit in a byte")]
    ByteRange(char),
    #[error("corrupt cell bytes: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// A cell value as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireValue {
    Null,
    Boolean(bool),
    Number(Number),
    Text(String),
}

impl WireValue {
    /// JSON form, for embedding in a response
    pub fn to_json(&self) -> Value {
        match self {
            WireValue::Null => Value::Null,
            WireValue::Boolean(b) => Value::Bool(*b),
            WireValue::Number(n) => Value::Number(n.clone()),
            WireValue::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Encode a value for the wire under `schema`
pub fn encode(value: &CellValue, schema: &CellSchema) -> Result<WireValue, CodecError> {
    let json = to_json(value, schema)?;
    if schema.is_structured() {
        return Ok(WireValue::Text(json.to_string()));
    }
    Ok(match json {
        Value::Null => WireValue::Null,
        Value::Bool(b) => WireValue::Boolean(b),
        Value::Number(n) => WireValue::Number(n),
        Value::String(s) => WireValue::Text(s),
        Value::Array(_) | Value::Object(_) => {
            return Err(CodecError::Mismatch {
                expected: schema.type_name().into_owned(),
                found: value.kind().to_string(),
            })
        }
    })
}

/// Decode a wire value under `schema`
///
/// Text is accepted only for `string`, `bytes`, `fixed` and structured
/// schemas; numbers, booleans and null must arrive as JSON literals.
pub fn decode(wire: &WireValue, schema: &CellSchema) -> Result<CellValue, CodecError> {
    match (wire, schema) {
        (WireValue::Text(text), CellSchema::String | CellSchema::Bytes | CellSchema::Fixed { .. }) => {
            decode_text(text, schema)
        }
        (WireValue::Text(text), schema) if schema.is_structured() => decode_text(text, schema),
        (WireValue::Text(_), schema) => Err(CodecError::Mismatch {
            expected: schema.type_name().into_owned(),
            found: "string".to_string(),
        }),
        (_, schema) if schema.is_structured() => Err(CodecError::Mismatch {
            expected: format!("{} as an escaped JSON string", schema.type_name()),
            found: json::json_kind(&wire.to_json()).to_string(),
        }),
        _ => from_json(&wire.to_json(), schema),
    }
}

/// Decode raw text, as found in a query string, under `schema`
///
/// `string`, `bytes` and `fixed` take the text verbatim; numbers, booleans
/// and null parse it as a JSON literal; structured schemas parse it as a
/// JSON document.
pub fn decode_text(text: &str, schema: &CellSchema) -> Result<CellValue, CodecError> {
    match schema {
        CellSchema::String | CellSchema::Bytes | CellSchema::Fixed { .. } => {
            from_json(&Value::String(text.to_string()), schema)
        }
        schema if schema.is_structured() => {
            let document: Value = serde_json::from_str(text)?;
            from_json(&document, schema)
        }
        _ => {
            let literal: Value = serde_json::from_str(text.trim()).map_err(|_| CodecError::Mismatch {
                expected: schema.type_name().into_owned(),
                found: format!("text {:?}", text),
            })?;
            from_json(&literal, schema)
        }
    }
}
