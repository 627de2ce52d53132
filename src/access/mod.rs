//! Row access: reads, writes and the row resource built on them

mod reader;
mod resource;
mod writer;

pub use reader::RowReader;
pub use resource::RowResource;
pub use writer::{RowLocator, RowWriter};
