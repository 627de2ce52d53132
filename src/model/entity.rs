//! Entity ids (row keys) and the row key formats that build them

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Errors raised while building or parsing an entity id
#[derive(Debug, thiserror::Error)]
pub enum EntityIdError {
    #[error("expected {expected} row key component(s), got {got}")]
    Arity { expected: usize, got: usize },
    #[error("row key component '{name}' must be {expected}")]
    Type { name: String, expected: &'static str },
    #[error("row key component '{name}' contains a NUL character")]
    Nul { name: String },
    #[error("invalid hex entity id: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Opaque row key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(Vec<u8>);

impl EntityId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse the lowercase or uppercase hex form used at the wire boundary
    pub fn from_hex(hex_id: &str) -> Result<Self, EntityIdError> {
        Ok(Self(hex::decode(hex_id)?))
    }

    /// Lowercase hex form
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex_id = String::deserialize(deserializer)?;
        EntityId::from_hex(&hex_id).map_err(serde::de::Error::custom)
    }
}

/// Type of one formatted row key component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    String,
    Int,
    Long,
}

/// One component of a formatted row key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyComponent {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ComponentType,
}

/// How entity ids are derived from row key components
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum RowKeyFormat {
    /// A single string whose UTF-8 bytes are the key
    #[default]
    Raw,
    /// Typed components, order-preserving encoding
    Formatted { components: Vec<KeyComponent> },
}

impl RowKeyFormat {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if let RowKeyFormat::Formatted { components } = self {
            if components.is_empty() {
                return Err("formatted row key needs at least one component".into());
            }
            for (i, component) in components.iter().enumerate() {
                if components[..i].iter().any(|c| c.name == component.name) {
                    return Err(format!("row key component '{}' is repeated", component.name));
                }
            }
        }
        Ok(())
    }

    /// Build an entity id from JSON component values
    pub fn entity_id(&self, values: &[Value]) -> Result<EntityId, EntityIdError> {
        match self {
            RowKeyFormat::Raw => {
                let [value] = values else {
                    return Err(EntityIdError::Arity {
                        expected: 1,
                        got: values.len(),
                    });
                };
                let s = value.as_str().ok_or_else(|| EntityIdError::Type {
                    name: "key".into(),
                    expected: "a string",
                })?;
                Ok(EntityId::new(s.as_bytes()))
            }
            RowKeyFormat::Formatted { components } => {
                if components.len() != values.len() {
                    return Err(EntityIdError::Arity {
                        expected: components.len(),
                        got: values.len(),
                    });
                }
                let mut key = Vec::new();
                for (component, value) in components.iter().zip(values) {
                    encode_component(component, value, &mut key)?;
                }
                Ok(EntityId::new(key))
            }
        }
    }

    /// Recover the component values of an entity id, if it has this format
    pub fn components(&self, entity_id: &EntityId) -> Option<Vec<Value>> {
        match self {
            RowKeyFormat::Raw => std::str::from_utf8(entity_id.as_bytes())
                .ok()
                .map(|s| vec![Value::String(s.to_string())]),
            RowKeyFormat::Formatted { components } => {
                let mut rest = entity_id.as_bytes();
                let mut values = Vec::with_capacity(components.len());
                for component in components {
                    let (value, tail) = decode_component(component.kind, rest)?;
                    values.push(value);
                    rest = tail;
                }
                rest.is_empty().then_some(values)
            }
        }
    }
}

fn encode_component(
    component: &KeyComponent,
    value: &Value,
    key: &mut Vec<u8>,
) -> Result<(), EntityIdError> {
    match component.kind {
        ComponentType::String => {
            let s = value.as_str().ok_or_else(|| EntityIdError::Type {
                name: component.name.clone(),
                expected: "a string",
            })?;
            if s.contains('\0') {
                return Err(EntityIdError::Nul {
                    name: component.name.clone(),
                });
            }
            key.extend_from_slice(s.as_bytes());
            key.push(0);
        }
        ComponentType::Int => {
            let i = value
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(|| EntityIdError::Type {
                    name: component.name.clone(),
                    expected: "a 32-bit integer",
                })?;
            key.extend_from_slice(&((i as u32) ^ (1 << 31)).to_be_bytes());
        }
        ComponentType::Long => {
            let l = value.as_i64().ok_or_else(|| EntityIdError::Type {
                name: component.name.clone(),
                expected: "a 64-bit integer",
            })?;
            key.extend_from_slice(&((l as u64) ^ (1 << 63)).to_be_bytes());
        }
    }
    Ok(())
}

fn decode_component(kind: ComponentType, bytes: &[u8]) -> Option<(Value, &[u8])> {
    match kind {
        ComponentType::String => {
            let end = bytes.iter().position(|&b| b == 0)?;
            let s = std::str::from_utf8(&bytes[..end]).ok()?;
            Some((Value::String(s.to_string()), &bytes[end + 1..]))
        }
        ComponentType::Int => {
            let (head, tail) = bytes.split_first_chunk::<4>()?;
            let i = (u32::from_be_bytes(*head) ^ (1 << 31)) as i32;
            Some((Value::from(i), tail))
        }
        ComponentType::Long => {
            let (head, tail) = bytes.split_first_chunk::<8>()?;
            let l = (u64::from_be_bytes(*head) ^ (1 << 63)) as i64;
            Some((Value::from(l), tail))
        }
    }
}
