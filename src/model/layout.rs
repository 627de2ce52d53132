//! Table layouts: column families, qualifiers and their schemas

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::entity::RowKeyFormat;
use super::schema::{is_identifier, CellSchema};

/// Errors raised while loading a layout
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("layout is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid layout: {0}")]
    Invalid(String),
}

/// A declared column of a group family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub name: String,
    pub schema: CellSchema,
}

/// A column family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FamilyLayout {
    /// Fixed qualifiers, each with its own schema
    Group {
        name: String,
        columns: Vec<ColumnLayout>,
    },
    /// Open qualifier set sharing one schema
    Map { name: String, schema: CellSchema },
}

impl FamilyLayout {
    pub fn name(&self) -> &str {
        match self {
            FamilyLayout::Group { name, .. } | FamilyLayout::Map { name, .. } => name,
        }
    }

    /// Schema of `qualifier` in this family, if the qualifier can exist
    pub fn cell_schema(&self, qualifier: &str) -> Option<&CellSchema> {
        match self {
            FamilyLayout::Group { columns, .. } => columns
                .iter()
                .find(|c| c.name == qualifier)
                .map(|c| &c.schema),
            FamilyLayout::Map { schema, .. } => Some(schema),
        }
    }
}

/// Immutable layout of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableLayout {
    pub name: String,
    #[serde(default)]
    pub row_key: RowKeyFormat,
    pub families: Vec<FamilyLayout>,
}

impl TableLayout {
    /// Create a validated layout
    pub fn new(
        name: impl Into<String>,
        row_key: RowKeyFormat,
        families: Vec<FamilyLayout>,
    ) -> Result<Self, LayoutError> {
        let layout = Self {
            name: name.into(),
            row_key,
            families,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Parse and validate layout JSON
    pub fn from_json_str(json: &str) -> Result<Self, LayoutError> {
        let layout: TableLayout = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Check names are identifiers and unique in their scope
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.name.is_empty() {
            return Err(LayoutError::Invalid("table name is empty".into()));
        }
        self.row_key
            .validate()
            .map_err(LayoutError::Invalid)?;

        let mut families = FxHashSet::default();
        for family in &self.families {
            if !is_identifier(family.name()) {
                return Err(LayoutError::Invalid(format!(
                    "invalid family name '{}'",
                    family.name()
                )));
            }
            if !families.insert(family.name()) {
                return Err(LayoutError::Invalid(format!(
                    "family '{}' is declared more than once",
                    family.name()
                )));
            }
            if let FamilyLayout::Group { name, columns } = family {
                let mut qualifiers = FxHashSet::default();
                for column in columns {
                    if !is_identifier(&column.name) {
                        return Err(LayoutError::Invalid(format!(
                            "invalid column name '{}:{}'",
                            name, column.name
                        )));
                    }
                    if !qualifiers.insert(column.name.as_str()) {
                        return Err(LayoutError::Invalid(format!(
                            "column '{}:{}' is declared more than once",
                            name, column.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Look up a family by name
    pub fn family(&self, name: &str) -> Option<&FamilyLayout> {
        self.families.iter().find(|f| f.name() == name)
    }

    /// Position of a family in layout order
    pub fn family_index(&self, name: &str) -> Option<usize> {
        self.families.iter().position(|f| f.name() == name)
    }

    /// Declared schema of a coordinate
    pub fn cell_schema(&self, family: &str, qualifier: &str) -> Option<&CellSchema> {
        self.family(family)?.cell_schema(qualifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"{
        "name": "users",
        "row_key": {"encoding": "formatted", "components": [{"name": "id", "type": "long"}]},
        "families": [
            {"kind": "group", "name": "info", "columns": [
                {"name": "email", "schema": "string"},
                {"name": "age", "schema": "int"}
            ]},
            {"kind": "map", "name": "tags", "schema": "string"}
        ]
    }"#;

    #[test]
    fn test_parse_layout() {
        let layout = TableLayout::from_json_str(LAYOUT).unwrap();
        assert_eq!(layout.families.len(), 2);
        assert_eq!(layout.family_index("tags"), Some(1));
        assert_eq!(layout.cell_schema("info", "age"), Some(&CellSchema::Int));
        assert_eq!(layout.cell_schema("info", "height"), None);
        assert_eq!(
            layout.cell_schema("tags", "any qualifier: at all"),
            Some(&CellSchema::String)
        );
        assert!(matches!(
            layout.family("tags"),
            Some(FamilyLayout::Map { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_family() {
        let json = r#"{"name": "t", "families": [
            {"kind": "map", "name": "a", "schema": "string"},
            {"kind": "map", "name": "a", "schema": "long"}
        ]}"#;
        assert!(matches!(
            TableLayout::from_json_str(json),
            Err(LayoutError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_bad_names() {
        let json = r#"{"name": "t", "families": [
            {"kind": "group", "name": "info", "columns": [{"name": "a:b", "schema": "string"}]}
        ]}"#;
        assert!(TableLayout::from_json_str(json).is_err());

        let json = r#"{"name": "t", "families": [{"kind": "map", "name": "9lives", "schema": "string"}]}"#;
        assert!(TableLayout::from_json_str(json).is_err());
    }

    #[test]
    fn test_round_trip_json() {
        let layout = TableLayout::from_json_str(LAYOUT).unwrap();
        let json = serde_json::to_string(&layout).unwrap();
        assert_eq!(TableLayout::from_json_str(&json).unwrap(), layout);
    }
}
