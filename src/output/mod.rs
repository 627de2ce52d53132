//! Output formatting for rows, locators, layouts and entity ids

mod json;
mod terminal;

use std::io::Write;

use anyhow::Result;

use crate::access::RowLocator;
use crate::config::OutputFormat;
use crate::model::{EntityId, Row, TableLayout};

pub use json::{JsonOutput, RestCell, RestRow};
pub use terminal::TerminalOutput;

/// Trait for output formatters
pub trait OutputFormatter {
    /// Render a row read
    fn render_row(&self, row: &Row, writer: &mut dyn Write) -> Result<()>;

    /// Render where a written row lives
    fn render_locator(&self, locator: &RowLocator, instance: &str, writer: &mut dyn Write) -> Result<()>;

    fn render_layout(&self, layout: &TableLayout, writer: &mut dyn Write) -> Result<()>;

    fn render_entity_id(&self, entity_id: &EntityId, writer: &mut dyn Write) -> Result<()>;
}

/// Factory for creating output formatters
pub struct OutputFactory;

impl OutputFactory {
    /// Create an output formatter based on format type
    pub fn create(format: OutputFormat, pretty_json: bool) -> Box<dyn OutputFormatter> {
        match format {
            OutputFormat::Terminal => Box::new(TerminalOutput::new()),
            OutputFormat::Json if pretty_json => Box::new(JsonOutput::new()),
            OutputFormat::Json => Box::new(JsonOutput::compact()),
        }
    }
}
