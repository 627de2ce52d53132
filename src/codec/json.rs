//! JSON encoding of cell values
//!
//! Follows the Avro JSON encoding: non-null union values are wrapped in a
//! single-key object naming the branch type, bytes and fixed map each byte
//! to one character in U+0000..=U+00FF.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use crate::model::{CellSchema, CellValue, RecordField};

use super::CodecError;

/// Encode `value` as JSON under `schema`
pub fn to_json(value: &CellValue, schema: &CellSchema) -> Result<Value, CodecError> {
    Ok(match (schema, value) {
        (CellSchema::Null, CellValue::Null) => Value::Null,
        (CellSchema::Boolean, CellValue::Boolean(b)) => Value::Bool(*b),
        (CellSchema::Int, CellValue::Int(i)) => Value::from(*i),
        (CellSchema::Long, CellValue::Long(l)) => Value::from(*l),
        (CellSchema::Float, CellValue::Float(f)) => float(*f)?,
        (CellSchema::Double, CellValue::Double(d)) => finite(*d, "double")?,
        (CellSchema::String, CellValue::String(s)) => Value::String(s.clone()),
        (CellSchema::Bytes, CellValue::Bytes(b)) => Value::String(bytes_to_string(b)),
        (CellSchema::Fixed { name, size }, CellValue::Fixed(b)) => {
            check_fixed_size(&name.fullname(), *size, b.len())?;
            Value::String(bytes_to_string(b))
        }
        (CellSchema::Enum { name, symbols }, CellValue::Enum(symbol)) => {
            if !symbols.contains(symbol) {
                return Err(CodecError::UnknownSymbol {
                    symbol: symbol.clone(),
                    name: name.fullname(),
                });
            }
            Value::String(symbol.clone())
        }
        (CellSchema::Array(items), CellValue::Array(values)) => Value::Array(
            values
                .iter()
                .map(|v| to_json(v, items))
                .collect::<Result<_, _>>()?,
        ),
        (CellSchema::Map(values_schema), CellValue::Map(entries)) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_json(v, values_schema)?)))
                .collect::<Result<Map<_, _>, CodecError>>()?,
        ),
        (CellSchema::Union(branches), CellValue::Union { branch, value }) => {
            let branch_schema = branches
                .get(*branch)
                .ok_or_else(|| CodecError::UnknownBranch(format!("#{}", branch)))?;
            match branch_schema {
                CellSchema::Null => to_json(value, branch_schema)?,
                _ => {
                    let mut wrapped = Map::new();
                    wrapped.insert(
                        branch_schema.type_name().into_owned(),
                        to_json(value, branch_schema)?,
                    );
                    Value::Object(wrapped)
                }
            }
        }
        (CellSchema::Record { name, fields }, CellValue::Record(values)) => {
            if let Some(extra) = values
                .keys()
                .find(|k| !fields.iter().any(|f| &f.name == *k))
            {
                return Err(CodecError::Mismatch {
                    expected: format!("fields of record {}", name.fullname()),
                    found: format!("field '{}'", extra),
                });
            }
            let mut object = Map::new();
            for field in fields {
                let field_value = values.get(&field.name).ok_or_else(|| CodecError::MissingField {
                    record: name.fullname(),
                    field: field.name.clone(),
                })?;
                object.insert(field.name.clone(), to_json(field_value, &field.schema)?);
            }
            Value::Object(object)
        }
        (schema, value) => {
            return Err(CodecError::Mismatch {
                expected: schema.type_name().into_owned(),
                found: value.kind().to_string(),
            })
        }
    })
}

/// Decode JSON produced for `schema` back into a value
pub fn from_json(json: &Value, schema: &CellSchema) -> Result<CellValue, CodecError> {
    let mismatch = || CodecError::Mismatch {
        expected: schema.type_name().into_owned(),
        found: json_kind(json).to_string(),
    };

    Ok(match schema {
        CellSchema::Null => match json {
            Value::Null => CellValue::Null,
            _ => return Err(mismatch()),
        },
        CellSchema::Boolean => CellValue::Boolean(json.as_bool().ok_or_else(mismatch)?),
        CellSchema::Int => {
            let n = json.as_number().ok_or_else(mismatch)?;
            let l = integer(n, "int").ok_or_else(mismatch)??;
            CellValue::Int(i32::try_from(l).map_err(|_| CodecError::OutOfRange {
                literal: n.to_string(),
                schema: "int",
            })?)
        }
        CellSchema::Long => {
            let n = json.as_number().ok_or_else(mismatch)?;
            CellValue::Long(integer(n, "long").ok_or_else(mismatch)??)
        }
        CellSchema::Float => {
            let n = json.as_number().ok_or_else(mismatch)?;
            let d = n.as_f64().ok_or_else(mismatch)?;
            let f = d as f32;
            if f.is_infinite() {
                return Err(CodecError::OutOfRange {
                    literal: n.to_string(),
                    schema: "float",
                });
            }
            CellValue::Float(f)
        }
        CellSchema::Double => {
            CellValue::Double(json.as_number().and_then(Number::as_f64).ok_or_else(mismatch)?)
        }
        CellSchema::String => CellValue::String(json.as_str().ok_or_else(mismatch)?.to_string()),
        CellSchema::Bytes => CellValue::Bytes(string_to_bytes(json.as_str().ok_or_else(mismatch)?)?),
        CellSchema::Fixed { name, size } => {
            let bytes = string_to_bytes(json.as_str().ok_or_else(mismatch)?)?;
            check_fixed_size(&name.fullname(), *size, bytes.len())?;
            CellValue::Fixed(bytes)
        }
        CellSchema::Enum { name, symbols } => {
            let symbol = json.as_str().ok_or_else(mismatch)?;
            if !symbols.iter().any(|s| s == symbol) {
                return Err(CodecError::UnknownSymbol {
                    symbol: symbol.to_string(),
                    name: name.fullname(),
                });
            }
            CellValue::Enum(symbol.to_string())
        }
        CellSchema::Array(items) => CellValue::Array(
            json.as_array()
                .ok_or_else(mismatch)?
                .iter()
                .map(|item| from_json(item, items))
                .collect::<Result<_, _>>()?,
        ),
        CellSchema::Map(values) => CellValue::Map(
            json.as_object()
                .ok_or_else(mismatch)?
                .iter()
                .map(|(k, v)| Ok((k.clone(), from_json(v, values)?)))
                .collect::<Result<IndexMap<_, _>, CodecError>>()?,
        ),
        CellSchema::Union(branches) => from_union_json(json, branches)?,
        CellSchema::Record { name, fields } => {
            let object = json.as_object().ok_or_else(mismatch)?;
            if let Some(extra) = object.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
                return Err(CodecError::Mismatch {
                    expected: format!("fields of record {}", name.fullname()),
                    found: format!("field '{}'", extra),
                });
            }
            let mut values = IndexMap::with_capacity(fields.len());
            for field in fields {
                let value = match object.get(&field.name) {
                    Some(v) => from_json(v, &field.schema)?,
                    None => field_default(field).ok_or_else(|| CodecError::MissingField {
                        record: name.fullname(),
                        field: field.name.clone(),
                    })??,
                };
                values.insert(field.name.clone(), value);
            }
            CellValue::Record(values)
        }
    })
}

/// Decode the default of a record field; union defaults use the first branch
pub(crate) fn field_default(field: &RecordField) -> Option<Result<CellValue, CodecError>> {
    let default = field.default.as_ref()?;
    Some(match &field.schema {
        CellSchema::Union(branches) => branches
            .first()
            .ok_or_else(|| CodecError::UnknownBranch("#0".into()))
            .and_then(|first| from_json(default, first))
            .map(|value| CellValue::Union {
                branch: 0,
                value: Box::new(value),
            }),
        schema => from_json(default, schema),
    })
}

fn from_union_json(json: &Value, branches: &[CellSchema]) -> Result<CellValue, CodecError> {
    let (branch, inner, branch_schema) = match json {
        Value::Null => {
            let branch = branches
                .iter()
                .position(|b| matches!(b, CellSchema::Null))
                .ok_or_else(|| CodecError::UnknownBranch("null".into()))?;
            (branch, json, &branches[branch])
        }
        Value::Object(object) if object.len() == 1 => {
            let (type_name, inner) = object
                .iter()
                .next()
                .ok_or_else(|| CodecError::UnknownBranch(String::new()))?;
            let branch = branches
                .iter()
                .position(|b| b.type_name() == type_name.as_str())
                .ok_or_else(|| CodecError::UnknownBranch(type_name.clone()))?;
            (branch, inner, &branches[branch])
        }
        other => {
            return Err(CodecError::Mismatch {
                expected: "union value ({\"<type>\": value} or null)".into(),
                found: json_kind(other).to_string(),
            })
        }
    };
    Ok(CellValue::Union {
        branch,
        value: Box::new(from_json(inner, branch_schema)?),
    })
}

/// Integer value of a JSON number; `None` for fractional numbers
fn integer(n: &Number, schema: &'static str) -> Option<Result<i64, CodecError>> {
    if let Some(l) = n.as_i64() {
        return Some(Ok(l));
    }
    if n.is_u64() {
        return Some(Err(CodecError::OutOfRange {
            literal: n.to_string(),
            schema,
        }));
    }
    None
}

fn finite(d: f64, schema: &'static str) -> Result<Value, CodecError> {
    Number::from_f64(d)
        .map(Value::Number)
        .ok_or(CodecError::NonFinite(schema))
}

/// Shortest decimal that reads back as `f`
fn float(f: f32) -> Result<Value, CodecError> {
    if !f.is_finite() {
        return Err(CodecError::NonFinite("float"));
    }
    let mut text = f.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text.parse::<Number>()
        .map(Value::Number)
        .map_err(|_| CodecError::NonFinite("float"))
}

fn check_fixed_size(name: &str, expected: usize, got: usize) -> Result<(), CodecError> {
    if expected != got {
        return Err(CodecError::FixedSize {
            name: name.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn string_to_bytes(s: &str) -> Result<Vec<u8>, CodecError> {
    s.chars()
        .map(|c| u8::try_from(c).map_err(|_| CodecError::ByteRange(c)))
        .collect()
}

pub(crate) fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "fractional number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn pick_ban() -> CellSchema {
        CellSchema::parse(
            r#"{"type": "record", "name": "PickBan", "fields": [
                {"name": "is_pick", "type": ["null", "boolean"], "default": null},
                {"name": "hero_id", "type": ["null", "long"], "default": null},
                {"name": "order", "type": ["null", "long"], "default": null},
                {"name": "team", "type": ["null", "long"], "default": null}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_union_wrapping() {
        let schema = pick_ban();
        let doc = json!({"is_pick": {"boolean": false}, "hero_id": {"long": 1}, "order": {"long": 2}, "team": null});
        let value = from_json(&doc, &schema).unwrap();
        let CellValue::Record(fields) = &value else {
            panic!("expected record");
        };
        assert_eq!(
            fields["hero_id"],
            CellValue::Union {
                branch: 1,
                value: Box::new(CellValue::Long(1))
            }
        );
        assert_eq!(to_json(&value, &schema).unwrap(), doc);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let schema = pick_ban();
        let value = from_json(&json!({"hero_id": {"long": 7}}), &schema).unwrap();
        let CellValue::Record(fields) = value else {
            panic!("expected record");
        };
        assert_eq!(
            fields["team"],
            CellValue::Union {
                branch: 0,
                value: Box::new(CellValue::Null)
            }
        );
    }

    #[test]
    fn test_rejects_bad_documents() {
        let schema = pick_ban();
        assert!(matches!(
            from_json(&json!({"hero_id": 7}), &schema),
            Err(CodecError::Mismatch { .. })
        ));
        assert!(matches!(
            from_json(&json!({"hero_id": {"string": "x"}}), &schema),
            Err(CodecError::UnknownBranch(b)) if b == "string"
        ));
        assert!(matches!(
            from_json(&json!({"villain": null}), &schema),
            Err(CodecError::Mismatch { .. })
        ));
        let required = CellSchema::parse(
            r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "long"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            from_json(&json!({}), &required),
            Err(CodecError::MissingField { .. })
        ));
    }

    #[test]
    fn test_numeric_widths() {
        assert_eq!(from_json(&json!(5), &CellSchema::Int).unwrap(), CellValue::Int(5));
        assert!(matches!(
            from_json(&json!(5_000_000_000i64), &CellSchema::Int),
            Err(CodecError::OutOfRange { .. })
        ));
        assert!(matches!(
            from_json(&json!(1.5), &CellSchema::Long),
            Err(CodecError::Mismatch { .. })
        ));
        assert_eq!(
            from_json(&json!(2), &CellSchema::Double).unwrap(),
            CellValue::Double(2.0)
        );
        assert!(matches!(
            to_json(&CellValue::Double(f64::NAN), &CellSchema::Double),
            Err(CodecError::NonFinite("double"))
        ));
    }

    #[test]
    fn test_float_keeps_its_own_precision() {
        let json = to_json(&CellValue::Float(0.1), &CellSchema::Float).unwrap();
        assert_eq!(json.to_string(), "0.1");
        assert_eq!(from_json(&json, &CellSchema::Float).unwrap(), CellValue::Float(0.1));

        let json = to_json(&CellValue::Float(3.0), &CellSchema::Float).unwrap();
        assert_eq!(json.to_string(), "3.0");
        assert_eq!(from_json(&json, &CellSchema::Float).unwrap(), CellValue::Float(3.0));

        assert!(matches!(
            to_json(&CellValue::Float(f32::INFINITY), &CellSchema::Float),
            Err(CodecError::NonFinite("float"))
        ));
    }

    #[test]
    fn test_bytes_as_latin1() {
        let value = CellValue::Bytes(vec![0, 0x7f, 0xff]);
        let json = to_json(&value, &CellSchema::Bytes).unwrap();
        assert_eq!(json, json!("\u{0}\u{7f}\u{ff}"));
        assert_eq!(from_json(&json, &CellSchema::Bytes).unwrap(), value);
        assert!(matches!(
            from_json(&json!("\u{100}"), &CellSchema::Bytes),
            Err(CodecError::ByteRange('\u{100}'))
        ));
    }
}
