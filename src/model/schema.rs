//! Cell schemas
//!
//! Cells are typed with schemas written in the Avro schema language: the
//! eight primitives plus records, enums, arrays, maps, fixed and unions.
//! Named types may be referenced after their definition; a named type cannot
//! refer to itself.

use std::borrow::Cow;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Errors raised while parsing or comparing schemas
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid schema: {0}")]
    Invalid(String),
    #[error("unknown schema type: {0}")]
    UnknownType(String),
    #[error("incompatible schemas: {0}")]
    Incompatible(String),
}

/// Name of a record, enum or fixed type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    pub name: String,
    pub namespace: Option<String>,
}

impl Name {
    /// Parse a possibly dotted name, falling back to the enclosing namespace
    fn new(raw: &str, namespace: Option<&str>) -> Result<Self, SchemaError> {
        let (namespace, name) = match raw.rsplit_once('.') {
            Some((ns, name)) => (Some(ns.to_string()), name),
            None => (namespace.filter(|ns| !ns.is_empty()).map(str::to_string), raw),
        };
        if !is_identifier(name) {
            return Err(SchemaError::Invalid(format!("invalid type name '{}'", raw)));
        }
        Ok(Self {
            name: name.to_string(),
            namespace,
        })
    }

    /// Dotted full name
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

/// A single field of a record schema
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub schema: CellSchema,
    /// Default value in JSON encoding, used when resolving older data
    pub default: Option<Value>,
}

/// Schema of a cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellSchema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Fixed { name: Name, size: usize },
    Enum { name: Name, symbols: Vec<String> },
    Array(Box<CellSchema>),
    Map(Box<CellSchema>),
    Union(Vec<CellSchema>),
    Record { name: Name, fields: Vec<RecordField> },
}

impl CellSchema {
    /// Parse schema JSON text
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    /// Build a schema from an already parsed JSON document
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        SchemaParser::default().parse(value, None)
    }

    /// JSON form of the schema; repeated named types are emitted as references
    pub fn to_json(&self) -> Value {
        let mut emitted = FxHashSet::default();
        self.to_json_inner(&mut emitted)
    }

    fn to_json_inner(&self, emitted: &mut FxHashSet<String>) -> Value {
        let mut object = Map::new();
        match self {
            CellSchema::Null
            | CellSchema::Boolean
            | CellSchema::Int
            | CellSchema::Long
            | CellSchema::Float
            | CellSchema::Double
            | CellSchema::Bytes
            | CellSchema::String => return Value::String(self.type_name().into_owned()),
            CellSchema::Fixed { name, size } => {
                if !emitted.insert(name.fullname()) {
                    return Value::String(name.fullname());
                }
                object.insert("type".into(), "fixed".into());
                object.insert("name".into(), name.fullname().into());
                object.insert("size".into(), (*size as u64).into());
            }
            CellSchema::Enum { name, symbols } => {
                if !emitted.insert(name.fullname()) {
                    return Value::String(name.fullname());
                }
                object.insert("type".into(), "enum".into());
                object.insert("name".into(), name.fullname().into());
                object.insert(
                    "symbols".into(),
                    Value::Array(symbols.iter().cloned().map(Value::String).collect()),
                );
            }
            CellSchema::Array(items) => {
                object.insert("type".into(), "array".into());
                object.insert("items".into(), items.to_json_inner(emitted));
            }
            CellSchema::Map(values) => {
                object.insert("type".into(), "map".into());
                object.insert("values".into(), values.to_json_inner(emitted));
            }
            CellSchema::Union(branches) => {
                return Value::Array(
                    branches
                        .iter()
                        .map(|branch| branch.to_json_inner(emitted))
                        .collect(),
                );
            }
            CellSchema::Record { name, fields } => {
                if !emitted.insert(name.fullname()) {
                    return Value::String(name.fullname());
                }
                object.insert("type".into(), "record".into());
                object.insert("name".into(), name.fullname().into());
                let fields = fields
                    .iter()
                    .map(|field| {
                        let mut f = Map::new();
                        f.insert("name".into(), field.name.clone().into());
                        f.insert("type".into(), field.schema.to_json_inner(emitted));
                        if let Some(default) = &field.default {
                            f.insert("default".into(), default.clone());
                        }
                        Value::Object(f)
                    })
                    .collect();
                object.insert("fields".into(), Value::Array(fields));
            }
        }
        Value::Object(object)
    }

    /// Name used for this type as a union branch in JSON encoding
    pub fn type_name(&self) -> Cow<'static, str> {
        match self {
            CellSchema::Null => Cow::Borrowed("null"),
            CellSchema::Boolean => Cow::Borrowed("boolean"),
            CellSchema::Int => Cow::Borrowed("int"),
            CellSchema::Long => Cow::Borrowed("long"),
            CellSchema::Float => Cow::Borrowed("float"),
            CellSchema::Double => Cow::Borrowed("double"),
            CellSchema::Bytes => Cow::Borrowed("bytes"),
            CellSchema::String => Cow::Borrowed("string"),
            CellSchema::Array(_) => Cow::Borrowed("array"),
            CellSchema::Map(_) => Cow::Borrowed("map"),
            CellSchema::Union(_) => Cow::Borrowed("union"),
            CellSchema::Fixed { name, .. }
            | CellSchema::Enum { name, .. }
            | CellSchema::Record { name, .. } => Cow::Owned(name.fullname()),
        }
    }

    /// Whether values of this schema travel as JSON documents inside a string
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            CellSchema::Record { .. }
                | CellSchema::Enum { .. }
                | CellSchema::Array(_)
                | CellSchema::Map(_)
                | CellSchema::Union(_)
        )
    }
}

impl fmt::Display for CellSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for CellSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CellSchema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        CellSchema::from_json(&value).map_err(serde::de::Error::custom)
    }
}

/// Most nodes a schema may have once named references are expanded
const MAX_SCHEMA_NODES: usize = 10_000;

/// Tracks named types defined so far in one schema document
///
/// Each reference to a named type expands into a copy of it, so the parser
/// counts expanded nodes and gives up past `MAX_SCHEMA_NODES`.
#[derive(Default)]
struct SchemaParser {
    /// Named types with their expanded node counts
    named: FxHashMap<String, (CellSchema, usize)>,
    nodes: usize,
}

impl SchemaParser {
    fn count(&mut self, nodes: usize) -> Result<(), SchemaError> {
        self.nodes = self.nodes.saturating_add(nodes);
        if self.nodes > MAX_SCHEMA_NODES {
            return Err(SchemaError::Invalid(format!(
                "schema expands to more than {} types",
                MAX_SCHEMA_NODES
            )));
        }
        Ok(())
    }

    fn parse(&mut self, value: &Value, namespace: Option<&str>) -> Result<CellSchema, SchemaError> {
        self.count(1)?;
        match value {
            Value::String(name) => self.parse_name(name, namespace),
            Value::Array(branches) => self.parse_union(branches, namespace),
            Value::Object(object) => self.parse_object(object, namespace),
            other => Err(SchemaError::Invalid(format!(
                "expected a type name, object or union, got {}",
                other
            ))),
        }
    }

    fn parse_name(&mut self, name: &str, namespace: Option<&str>) -> Result<CellSchema, SchemaError> {
        if let Some(primitive) = primitive(name) {
            return Ok(primitive);
        }
        let key = match namespace.map(|ns| format!("{}.{}", ns, name)) {
            Some(qualified) if !self.named.contains_key(name) => qualified,
            _ => name.to_string(),
        };
        let size = self
            .named
            .get(&key)
            .map(|(_, size)| *size)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))?;
        // Count before copying so an oversized expansion is never built
        self.count(size)?;
        self.named
            .get(&key)
            .map(|(schema, _)| schema.clone())
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    fn parse_union(
        &mut self,
        branches: &[Value],
        namespace: Option<&str>,
    ) -> Result<CellSchema, SchemaError> {
        let mut seen = FxHashSet::default();
        let mut parsed = Vec::with_capacity(branches.len());
        for branch in branches {
            let schema = self.parse(branch, namespace)?;
            if matches!(schema, CellSchema::Union(_)) {
                return Err(SchemaError::Invalid("unions may not contain unions".into()));
            }
            if !seen.insert(schema.type_name()) {
                return Err(SchemaError::Invalid(format!(
                    "union contains '{}' more than once",
                    schema.type_name()
                )));
            }
            parsed.push(schema);
        }
        if parsed.is_empty() {
            return Err(SchemaError::Invalid("union has no branches".into()));
        }
        Ok(CellSchema::Union(parsed))
    }

    fn parse_object(
        &mut self,
        object: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> Result<CellSchema, SchemaError> {
        let type_value = object
            .get("type")
            .ok_or_else(|| SchemaError::Invalid("schema object without 'type'".into()))?;
        let type_name = match type_value {
            Value::String(s) => s.as_str(),
            nested => return self.parse(nested, namespace),
        };

        match type_name {
            "record" | "error" => self.parse_record(object, namespace),
            "enum" => {
                let name = self.define_name(object, namespace)?;
                let symbols = object
                    .get("symbols")
                    .and_then(Value::as_array)
                    .ok_or_else(|| SchemaError::Invalid("enum without 'symbols'".into()))?
                    .iter()
                    .map(|s| {
                        s.as_str()
                            .filter(|s| is_identifier(s))
                            .map(str::to_string)
                            .ok_or_else(|| SchemaError::Invalid(format!("invalid enum symbol {}", s)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let unique: FxHashSet<_> = symbols.iter().collect();
                if unique.len() != symbols.len() {
                    return Err(SchemaError::Invalid(format!(
                        "enum '{}' repeats a symbol",
                        name.fullname()
                    )));
                }
                self.register(CellSchema::Enum { name, symbols }, 1)
            }
            "fixed" => {
                let name = self.define_name(object, namespace)?;
                let size = object
                    .get("size")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| SchemaError::Invalid("fixed without 'size'".into()))?;
                let size = usize::try_from(size)
                    .map_err(|_| SchemaError::Invalid(format!("fixed size {} too large", size)))?;
                self.register(CellSchema::Fixed { name, size }, 1)
            }
            "array" => {
                let items = object
                    .get("items")
                    .ok_or_else(|| SchemaError::Invalid("array without 'items'".into()))?;
                Ok(CellSchema::Array(Box::new(self.parse(items, namespace)?)))
            }
            "map" => {
                let values = object
                    .get("values")
                    .ok_or_else(|| SchemaError::Invalid("map without 'values'".into()))?;
                Ok(CellSchema::Map(Box::new(self.parse(values, namespace)?)))
            }
            other => self.parse_name(other, namespace),
        }
    }

    fn parse_record(
        &mut self,
        object: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> Result<CellSchema, SchemaError> {
        let start = self.nodes;
        let name = self.define_name(object, namespace)?;
        let fields_json = object
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::Invalid(format!("record '{}' without 'fields'", name.fullname())))?;

        let mut seen = FxHashSet::default();
        let mut fields = Vec::with_capacity(fields_json.len());
        for field in fields_json {
            let field_name = field
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| is_identifier(n))
                .ok_or_else(|| SchemaError::Invalid(format!("invalid field in record '{}'", name.fullname())))?;
            if !seen.insert(field_name.to_string()) {
                return Err(SchemaError::Invalid(format!(
                    "record '{}' repeats field '{}'",
                    name.fullname(),
                    field_name
                )));
            }
            let field_type = field.get("type").ok_or_else(|| {
                SchemaError::Invalid(format!("field '{}' without 'type'", field_name))
            })?;
            let schema = self.parse(field_type, name.namespace.as_deref())?;
            fields.push(RecordField {
                name: field_name.to_string(),
                schema,
                default: field.get("default").cloned(),
            });
        }

        let size = self.nodes - start + 1;
        self.register(CellSchema::Record { name, fields }, size)
    }

    fn define_name(
        &self,
        object: &Map<String, Value>,
        namespace: Option<&str>,
    ) -> Result<Name, SchemaError> {
        let raw = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::Invalid("named type without 'name'".into()))?;
        let namespace = object
            .get("namespace")
            .and_then(Value::as_str)
            .or(namespace);
        let name = Name::new(raw, namespace)?;
        if self.named.contains_key(&name.fullname()) || primitive(&name.name).is_some() {
            return Err(SchemaError::Invalid(format!(
                "type '{}' is defined more than once",
                name.fullname()
            )));
        }
        Ok(name)
    }

    fn register(&mut self, schema: CellSchema, size: usize) -> Result<CellSchema, SchemaError> {
        self.named
            .insert(schema.type_name().into_owned(), (schema.clone(), size));
        Ok(schema)
    }
}

fn primitive(name: &str) -> Option<CellSchema> {
    Some(match name {
        "null" => CellSchema::Null,
        "boolean" => CellSchema::Boolean,
        "int" => CellSchema::Int,
        "long" => CellSchema::Long,
        "float" => CellSchema::Float,
        "double" => CellSchema::Double,
        "bytes" => CellSchema::Bytes,
        "string" => CellSchema::String,
        _ => return None,
    })
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
