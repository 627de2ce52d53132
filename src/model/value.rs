//! Typed cell values

use std::borrow::Cow;

use indexmap::IndexMap;

/// A cell value as held in memory, shaped by its schema
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Fixed(Vec<u8>),
    /// Enum symbol
    Enum(String),
    Array(Vec<CellValue>),
    Map(IndexMap<String, CellValue>),
    /// Value of the union branch at `branch`
    Union { branch: usize, value: Box<CellValue> },
    /// Record fields in schema order
    Record(IndexMap<String, CellValue>),
}

impl CellValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Short human-readable rendering, used by the terminal output
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed("null"),
            CellValue::Boolean(b) => Cow::Owned(b.to_string()),
            CellValue::Int(i) => Cow::Owned(i.to_string()),
            CellValue::Long(l) => Cow::Owned(l.to_string()),
            CellValue::Float(f) => Cow::Owned(f.to_string()),
            CellValue::Double(d) => Cow::Owned(d.to_string()),
            CellValue::String(s) => Cow::Borrowed(s.as_str()),
            CellValue::Enum(symbol) => Cow::Borrowed(symbol.as_str()),
            CellValue::Bytes(b) | CellValue::Fixed(b) => Cow::Owned(format!("0x{}", hex::encode(b))),
            CellValue::Union { value, .. } => value.display(),
            CellValue::Array(items) => Cow::Owned(format!(
                "[{}]",
                items
                    .iter()
                    .map(|item| item.display().into_owned())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            CellValue::Map(entries) | CellValue::Record(entries) => Cow::Owned(format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.display()))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }

    /// Name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Boolean(_) => "boolean",
            CellValue::Int(_) => "int",
            CellValue::Long(_) => "long",
            CellValue::Float(_) => "float",
            CellValue::Double(_) => "double",
            CellValue::String(_) => "string",
            CellValue::Bytes(_) => "bytes",
            CellValue::Fixed(_) => "fixed",
            CellValue::Enum(_) => "enum",
            CellValue::Array(_) => "array",
            CellValue::Map(_) => "map",
            CellValue::Union { .. } => "union",
            CellValue::Record(_) => "record",
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Int(i)
    }
}

impl From<i64> for CellValue {
    fn from(l: i64) -> Self {
        CellValue::Long(l)
    }
}

impl From<f64> for CellValue {
    fn from(d: f64) -> Self {
        CellValue::Double(d)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CellValue::from(1000i64).display(), "1000");
        assert_eq!(CellValue::from("iphone").display(), "iphone");
        assert_eq!(CellValue::Bytes(vec![0xca, 0xfe]).display(), "0xcafe");

        let mut fields = IndexMap::new();
        fields.insert("username".to_string(), CellValue::from("some_user"));
        fields.insert(
            "num_purchases".to_string(),
            CellValue::Union {
                branch: 1,
                value: Box::new(CellValue::Long(10)),
            },
        );
        assert_eq!(
            CellValue::Record(fields).display(),
            "{username: some_user, num_purchases: 10}"
        );
    }
}
