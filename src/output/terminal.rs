//! Human-readable terminal output

use std::io::Write;

use anyhow::Result;
use chrono::DateTime;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::access::RowLocator;
use crate::model::{EntityId, FamilyLayout, Row, TableLayout, Timestamp};

use super::OutputFormatter;

/// Terminal output as tables
pub struct TerminalOutput;

impl TerminalOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Timestamps are milliseconds since the epoch
fn format_time(ts: Timestamp) -> String {
    i64::try_from(ts.get())
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn build_table(builder: Builder) -> String {
    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

impl OutputFormatter for TerminalOutput {
    fn render_row(&self, row: &Row, writer: &mut dyn Write) -> Result<()> {
        writeln!(writer, "Row {} ({} cells)", row.entity_id, row.cell_count())?;
        if row.cells.is_empty() {
            return Ok(());
        }

        let mut builder = Builder::default();
        builder.push_record(["family", "qualifier", "timestamp", "time (UTC)", "value"]);
        for cell in &row.cells {
            builder.push_record([
                cell.family().to_string(),
                format!("{:?}", cell.qualifier()),
                cell.timestamp.to_string(),
                format_time(cell.timestamp),
                cell.value.display().into_owned(),
            ]);
        }
        writeln!(writer, "{}", build_table(builder))?;
        Ok(())
    }

    fn render_locator(&self, locator: &RowLocator, instance: &str, writer: &mut dyn Write) -> Result<()> {
        writeln!(writer, "Wrote {}", locator.path(instance))?;
        Ok(())
    }

    fn render_layout(&self, layout: &TableLayout, writer: &mut dyn Write) -> Result<()> {
        writeln!(writer, "Table {}", layout.name)?;
        let mut builder = Builder::default();
        builder.push_record(["family", "kind", "qualifier", "schema"]);
        for family in &layout.families {
            match family {
                FamilyLayout::Group { name, columns } => {
                    for column in columns {
                        builder.push_record([
                            name.clone(),
                            "group".to_string(),
                            column.name.clone(),
                            column.schema.to_string(),
                        ]);
                    }
                }
                FamilyLayout::Map { name, schema } => {
                    builder.push_record([name.clone(), "map".to_string(), "*".to_string(), schema.to_string()]);
                }
            }
        }
        writeln!(writer, "{}", build_table(builder))?;
        Ok(())
    }

    fn render_entity_id(&self, entity_id: &EntityId, writer: &mut dyn Write) -> Result<()> {
        writeln!(writer, "{}", entity_id)?;
        Ok(())
    }
}
