//! Request interpretation: columns, versions, time ranges and wire parameters

mod columns;
mod params;
mod time;

pub use columns::{resolve_column, resolve_columns, ColumnRequest, ColumnSpec};
pub use params::{PendingWrite, ReadQuery};
pub use time::{filter_versions, TimeRange, VersionLimit};
