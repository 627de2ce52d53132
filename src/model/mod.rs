//! Data model for rows, cells, layouts and schemas

mod entity;
mod layout;
mod row;
mod schema;
mod value;

pub use entity::{ComponentType, EntityId, EntityIdError, KeyComponent, RowKeyFormat};
pub use layout::{ColumnLayout, FamilyLayout, LayoutError, TableLayout};
pub use row::{Cell, Coordinate, Row, Timestamp, Timestamped};
pub use schema::{CellSchema, Name, RecordField, SchemaError};
pub use value::CellValue;
