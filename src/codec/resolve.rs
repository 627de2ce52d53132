//! Writer → reader schema resolution
//!
//! A value stored under one schema is read under another following the Avro
//! resolution rules: numeric promotion, string/bytes interchange, record
//! fields matched by name (missing ones filled from defaults), enum symbols
//! matched by name and union branches selected by type.

use indexmap::IndexMap;

use crate::model::{CellSchema, CellValue, SchemaError};

use super::json::field_default;
use super::CodecError;

/// Check that data written with `writer` can be read with `reader`
pub fn check_compatible(writer: &CellSchema, reader: &CellSchema) -> Result<(), SchemaError> {
    if writer == reader {
        return Ok(());
    }
    let incompatible = |why: String| Err(SchemaError::Incompatible(why));

    match (writer, reader) {
        (CellSchema::Union(branches), _) => {
            for branch in branches {
                check_compatible(branch, reader)?;
            }
            Ok(())
        }
        (_, CellSchema::Union(branches)) => match reader_branch(writer, branches) {
            Some(_) => Ok(()),
            None => incompatible(format!(
                "no branch of reader union accepts {}",
                writer.type_name()
            )),
        },
        (CellSchema::Int, CellSchema::Long | CellSchema::Float | CellSchema::Double)
        | (CellSchema::Long, CellSchema::Float | CellSchema::Double)
        | (CellSchema::Float, CellSchema::Double)
        | (CellSchema::String, CellSchema::Bytes)
        | (CellSchema::Bytes, CellSchema::String) => Ok(()),
        (
            CellSchema::Record {
                name: writer_name,
                fields: writer_fields,
            },
            CellSchema::Record {
                name: reader_name,
                fields: reader_fields,
            },
        ) => {
            if writer_name.name != reader_name.name {
                return incompatible(format!(
                    "record {} cannot be read as {}",
                    writer_name.fullname(),
                    reader_name.fullname()
                ));
            }
            for field in reader_fields {
                match writer_fields.iter().find(|f| f.name == field.name) {
                    Some(written) => check_compatible(&written.schema, &field.schema)?,
                    None if field.default.is_some() => {}
                    None => {
                        return incompatible(format!(
                            "reader field '{}' of {} has no default and is absent from the writer",
                            field.name,
                            reader_name.fullname()
                        ))
                    }
                }
            }
            Ok(())
        }
        (
            CellSchema::Enum {
                name: writer_name,
                symbols: writer_symbols,
            },
            CellSchema::Enum {
                name: reader_name,
                symbols: reader_symbols,
            },
        ) => {
            if writer_name.name != reader_name.name {
                return incompatible(format!(
                    "enum {} cannot be read as {}",
                    writer_name.fullname(),
                    reader_name.fullname()
                ));
            }
            match writer_symbols.iter().find(|s| !reader_symbols.contains(s)) {
                Some(missing) => incompatible(format!(
                    "symbol '{}' is unknown to reader enum {}",
                    missing,
                    reader_name.fullname()
                )),
                None => Ok(()),
            }
        }
        (
            CellSchema::Fixed {
                name: writer_name,
                size: writer_size,
            },
            CellSchema::Fixed {
                name: reader_name,
                size: reader_size,
            },
        ) if writer_name.name == reader_name.name && writer_size == reader_size => Ok(()),
        (CellSchema::Array(writer_items), CellSchema::Array(reader_items)) => {
            check_compatible(writer_items, reader_items)
        }
        (CellSchema::Map(writer_values), CellSchema::Map(reader_values)) => {
            check_compatible(writer_values, reader_values)
        }
        _ => incompatible(format!(
            "{} cannot be read as {}",
            writer.type_name(),
            reader.type_name()
        )),
    }
}

/// Branch of a reader union that reads `writer`, preferring an exact type match
fn reader_branch(writer: &CellSchema, branches: &[CellSchema]) -> Option<usize> {
    branches
        .iter()
        .position(|b| b.type_name() == writer.type_name() && check_compatible(writer, b).is_ok())
        .or_else(|| {
            branches
                .iter()
                .position(|b| check_compatible(writer, b).is_ok())
        })
}

/// Convert a value written with `writer` into its `reader` form
pub fn resolve(
    value: CellValue,
    writer: &CellSchema,
    reader: &CellSchema,
) -> Result<CellValue, CodecError> {
    if writer == reader {
        return Ok(value);
    }

    if let (CellSchema::Union(branches), CellValue::Union { branch, value }) = (writer, &value) {
        let branch_schema = branches
            .get(*branch)
            .ok_or_else(|| CodecError::UnknownBranch(format!("#{}", branch)))?;
        return resolve((**value).clone(), branch_schema, reader);
    }

    if let CellSchema::Union(branches) = reader {
        let branch = reader_branch(writer, branches).ok_or_else(|| {
            SchemaError::Incompatible(format!(
                "no branch of reader union accepts {}",
                writer.type_name()
            ))
        })?;
        return Ok(CellValue::Union {
            branch,
            value: Box::new(resolve(value, writer, &branches[branch])?),
        });
    }

    Ok(match (reader, value) {
        (CellSchema::Long, CellValue::Int(i)) => CellValue::Long(i64::from(i)),
        (CellSchema::Float, CellValue::Int(i)) => CellValue::Float(i as f32),
        (CellSchema::Float, CellValue::Long(l)) => CellValue::Float(l as f32),
        (CellSchema::Double, CellValue::Int(i)) => CellValue::Double(f64::from(i)),
        (CellSchema::Double, CellValue::Long(l)) => CellValue::Double(l as f64),
        (CellSchema::Double, CellValue::Float(f)) => CellValue::Double(f64::from(f)),
        (CellSchema::Bytes, CellValue::String(s)) => CellValue::Bytes(s.into_bytes()),
        (CellSchema::String, CellValue::Bytes(b)) => CellValue::String(
            String::from_utf8(b).map_err(|e| CodecError::Corrupt(format!("bytes are not UTF-8: {}", e)))?,
        ),
        (CellSchema::Enum { name, symbols }, CellValue::Enum(symbol)) => {
            if !symbols.contains(&symbol) {
                return Err(CodecError::UnknownSymbol {
                    symbol,
                    name: name.fullname(),
                });
            }
            CellValue::Enum(symbol)
        }
        (CellSchema::Array(reader_items), CellValue::Array(values)) => {
            let CellSchema::Array(writer_items) = writer else {
                return Err(incompatible(writer, reader));
            };
            CellValue::Array(
                values
                    .into_iter()
                    .map(|v| resolve(v, writer_items, reader_items))
                    .collect::<Result<_, _>>()?,
            )
        }
        (CellSchema::Map(reader_values), CellValue::Map(entries)) => {
            let CellSchema::Map(writer_values) = writer else {
                return Err(incompatible(writer, reader));
            };
            CellValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((k, resolve(v, writer_values, reader_values)?)))
                    .collect::<Result<IndexMap<_, _>, CodecError>>()?,
            )
        }
        (
            CellSchema::Record {
                name,
                fields: reader_fields,
            },
            CellValue::Record(mut values),
        ) => {
            let CellSchema::Record {
                fields: writer_fields,
                ..
            } = writer
            else {
                return Err(incompatible(writer, reader));
            };
            let mut resolved = IndexMap::with_capacity(reader_fields.len());
            for field in reader_fields {
                let value = match writer_fields.iter().find(|f| f.name == field.name) {
                    Some(written) => {
                        let v = values.swap_remove(&field.name).ok_or_else(|| {
                            CodecError::MissingField {
                                record: name.fullname(),
                                field: field.name.clone(),
                            }
                        })?;
                        resolve(v, &written.schema, &field.schema)?
                    }
                    None => field_default(field).ok_or_else(|| CodecError::MissingField {
                        record: name.fullname(),
                        field: field.name.clone(),
                    })??,
                };
                resolved.insert(field.name.clone(), value);
            }
            CellValue::Record(resolved)
        }
        (reader, value) if same_shape(reader, &value) => value,
        _ => return Err(incompatible(writer, reader)),
    })
}

fn same_shape(schema: &CellSchema, value: &CellValue) -> bool {
    matches!(
        (schema, value),
        (CellSchema::Null, CellValue::Null)
            | (CellSchema::Boolean, CellValue::Boolean(_))
            | (CellSchema::Int, CellValue::Int(_))
            | (CellSchema::Long, CellValue::Long(_))
            | (CellSchema::Float, CellValue::Float(_))
            | (CellSchema::Double, CellValue::Double(_))
            | (CellSchema::String, CellValue::String(_))
            | (CellSchema::Bytes, CellValue::Bytes(_))
            | (CellSchema::Fixed { .. }, CellValue::Fixed(_))
    )
}

fn incompatible(writer: &CellSchema, reader: &CellSchema) -> CodecError {
    CodecError::Schema(SchemaError::Incompatible(format!(
        "{} cannot be read as {}",
        writer.type_name(),
        reader.type_name()
    )))
}
