//! rowgate - row-level access to a versioned wide-column store
//!
//! Reads and writes single rows of column-family tables through a flat,
//! query-string shaped interface, converting between typed cell values and
//! their wire form using each column's schema.

pub mod access;
pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod query;
pub mod store;

pub use access::{RowLocator, RowResource};
pub use config::Config;
pub use error::{ErrorKind, RowError};
pub use model::{Row, TableLayout};
