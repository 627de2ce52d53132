//! Storage encoding of cells
//!
//! A stored cell is the writer schema's JSON as a length-prefixed string,
//! followed by the value in Avro binary encoding (zig-zag varints,
//! little-endian floats, length-prefixed bytes, blocked arrays and maps).

use indexmap::IndexMap;

use crate::model::{CellSchema, CellValue};

use super::CodecError;

/// Upper bound on items in one array or map block
const MAX_BLOCK_ITEMS: u64 = 1 << 24;

/// Encode a cell value with the schema it was written with
pub fn encode_cell(value: &CellValue, writer_schema: &CellSchema) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    write_bytes(writer_schema.to_json().to_string().as_bytes(), &mut out);
    write_value(value, writer_schema, &mut out)?;
    Ok(out)
}

/// Decode stored cell bytes into their writer schema and value
pub fn decode_cell(bytes: &[u8]) -> Result<(CellSchema, CellValue), CodecError> {
    let mut reader = Reader { input: bytes };
    let schema_json = reader.read_string()?;
    let writer_schema = CellSchema::parse(&schema_json)?;
    let value = reader.read_value(&writer_schema)?;
    if !reader.input.is_empty() {
        return Err(CodecError::Corrupt(format!(
            "{} trailing byte(s) after value",
            reader.input.len()
        )));
    }
    Ok((writer_schema, value))
}

fn write_long(n: i64, out: &mut Vec<u8>) {
    let mut z = ((n << 1) ^ (n >> 63)) as u64;
    while z >= 0x80 {
        out.push((z as u8) | 0x80);
        z >>= 7;
    }
    out.push(z as u8);
}

fn write_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    write_long(bytes.len() as i64, out);
    out.extend_from_slice(bytes);
}

fn write_value(value: &CellValue, schema: &CellSchema, out: &mut Vec<u8>) -> Result<(), CodecError> {
    match (schema, value) {
        (CellSchema::Null, CellValue::Null) => {}
        (CellSchema::Boolean, CellValue::Boolean(b)) => out.push(u8::from(*b)),
        (CellSchema::Int, CellValue::Int(i)) => write_long(i64::from(*i), out),
        (CellSchema::Long, CellValue::Long(l)) => write_long(*l, out),
        (CellSchema::Float, CellValue::Float(f)) => out.extend_from_slice(&f.to_le_bytes()),
        (CellSchema::Double, CellValue::Double(d)) => out.extend_from_slice(&d.to_le_bytes()),
        (CellSchema::String, CellValue::String(s)) => write_bytes(s.as_bytes(), out),
        (CellSchema::Bytes, CellValue::Bytes(b)) => write_bytes(b, out),
        (CellSchema::Fixed { name, size }, CellValue::Fixed(b)) => {
            if b.len() != *size {
                return Err(CodecError::FixedSize {
                    name: name.fullname(),
                    expected: *size,
                    got: b.len(),
                });
            }
            out.extend_from_slice(b);
        }
        (CellSchema::Enum { name, symbols }, CellValue::Enum(symbol)) => {
            let index = symbols
                .iter()
                .position(|s| s == symbol)
                .ok_or_else(|| CodecError::UnknownSymbol {
                    symbol: symbol.clone(),
                    name: name.fullname(),
                })?;
            write_long(index as i64, out);
        }
        (CellSchema::Array(items), CellValue::Array(values)) => {
            if !values.is_empty() {
                write_long(values.len() as i64, out);
                for v in values {
                    write_value(v, items, out)?;
                }
            }
            write_long(0, out);
        }
        (CellSchema::Map(values_schema), CellValue::Map(entries)) => {
            if !entries.is_empty() {
                write_long(entries.len() as i64, out);
                for (k, v) in entries {
                    write_bytes(k.as_bytes(), out);
                    write_value(v, values_schema, out)?;
                }
            }
            write_long(0, out);
        }
        (CellSchema::Union(branches), CellValue::Union { branch, value }) => {
            let branch_schema = branches
                .get(*branch)
                .ok_or_else(|| CodecError::UnknownBranch(format!("#{}", branch)))?;
            write_long(*branch as i64, out);
            write_value(value, branch_schema, out)?;
        }
        (CellSchema::Record { name, fields }, CellValue::Record(values)) => {
            for field in fields {
                let v = values.get(&field.name).ok_or_else(|| CodecError::MissingField {
                    record: name.fullname(),
                    field: field.name.clone(),
                })?;
                write_value(v, &field.schema, out)?;
            }
        }
        (schema, value) => {
            return Err(CodecError::Mismatch {
                expected: schema.type_name().into_owned(),
                found: value.kind().to_string(),
            })
        }
    }
    Ok(())
}

struct Reader<'a> {
    input: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.input.len() < n {
            return Err(CodecError::Corrupt(format!(
                "needed {} byte(s), {} left",
                n,
                self.input.len()
            )));
        }
        let (head, tail) = self.input.split_at(n);
        self.input = tail;
        Ok(head)
    }

    fn read_long(&mut self) -> Result<i64, CodecError> {
        let mut z: u64 = 0;
        for shift in (0..64).step_by(7) {
            let byte = self.take(1)?[0];
            z |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok((z >> 1) as i64 ^ -((z & 1) as i64));
            }
        }
        Err(CodecError::Corrupt("varint longer than 10 bytes".into()))
    }

    fn read_len(&mut self) -> Result<usize, CodecError> {
        let len = self.read_long()?;
        usize::try_from(len).map_err(|_| CodecError::Corrupt(format!("negative length {}", len)))
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        String::from_utf8(self.read_bytes()?)
            .map_err(|e| CodecError::Corrupt(format!("string is not UTF-8: {}", e)))
    }

    /// Item count of the next block, 0 at the end of the collection
    fn read_block_len(&mut self) -> Result<u64, CodecError> {
        let count = self.read_long()?;
        if count < 0 {
            // Negative counts are followed by the block size in bytes
            self.read_long()?;
        }
        let count = count.unsigned_abs();
        if count > MAX_BLOCK_ITEMS {
            return Err(CodecError::Corrupt(format!("block of {} items", count)));
        }
        Ok(count)
    }

    fn read_value(&mut self, schema: &CellSchema) -> Result<CellValue, CodecError> {
        Ok(match schema {
            CellSchema::Null => CellValue::Null,
            CellSchema::Boolean => match self.take(1)?[0] {
                0 => CellValue::Boolean(false),
                1 => CellValue::Boolean(true),
                b => return Err(CodecError::Corrupt(format!("invalid boolean byte {}", b))),
            },
            CellSchema::Int => {
                let l = self.read_long()?;
                CellValue::Int(
                    i32::try_from(l).map_err(|_| CodecError::Corrupt(format!("int out of range: {}", l)))?,
                )
            }
            CellSchema::Long => CellValue::Long(self.read_long()?),
            CellSchema::Float => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(self.take(4)?);
                CellValue::Float(f32::from_le_bytes(buf))
            }
            CellSchema::Double => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(self.take(8)?);
                CellValue::Double(f64::from_le_bytes(buf))
            }
            CellSchema::String => CellValue::String(self.read_string()?),
            CellSchema::Bytes => CellValue::Bytes(self.read_bytes()?),
            CellSchema::Fixed { size, .. } => CellValue::Fixed(self.take(*size)?.to_vec()),
            CellSchema::Enum { symbols, .. } => {
                let index = self.read_len()?;
                let symbol = symbols
                    .get(index)
                    .ok_or_else(|| CodecError::Corrupt(format!("enum index {} out of range", index)))?;
                CellValue::Enum(symbol.clone())
            }
            CellSchema::Array(items) => {
                let mut values = Vec::new();
                loop {
                    let count = self.read_block_len()?;
                    if count == 0 {
                        break;
                    }
                    for _ in 0..count {
                        values.push(self.read_value(items)?);
                    }
                }
                CellValue::Array(values)
            }
            CellSchema::Map(values_schema) => {
                let mut entries = IndexMap::new();
                loop {
                    let count = self.read_block_len()?;
                    if count == 0 {
                        break;
                    }
                    for _ in 0..count {
                        let key = self.read_string()?;
                        entries.insert(key, self.read_value(values_schema)?);
                    }
                }
                CellValue::Map(entries)
            }
            CellSchema::Union(branches) => {
                let branch = self.read_len()?;
                let branch_schema = branches
                    .get(branch)
                    .ok_or_else(|| CodecError::Corrupt(format!("union branch {} out of range", branch)))?;
                CellValue::Union {
                    branch,
                    value: Box::new(self.read_value(branch_schema)?),
                }
            }
            CellSchema::Record { fields, .. } => {
                let mut values = IndexMap::with_capacity(fields.len());
                for field in fields {
                    values.insert(field.name.clone(), self.read_value(&field.schema)?);
                }
                CellValue::Record(values)
            }
        })
    }
}
