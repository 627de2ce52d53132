//! rowgate - read and write rows of snapshot-backed tables

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use rowgate::config::{Config, OutputFormat};
use rowgate::error::ErrorKind;
use rowgate::model::TableLayout;
use rowgate::output::OutputFactory;
use rowgate::query::VersionLimit;
use rowgate::store::{snapshot, InMemoryStore};
use rowgate::{RowError, RowResource};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Terminal,
    Json,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Terminal => OutputFormat::Terminal,
            CliOutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Row-level access to versioned column-family tables
#[derive(Parser, Debug)]
#[command(name = "rowgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Table snapshot file
    #[arg(short, long, global = true, default_value = "tables.json")]
    tables: PathBuf,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "terminal")]
    format: CliOutputFormat,

    /// Indent JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Instance name used in row locations
    #[arg(long, global = true, default_value = "default")]
    instance: String,

    /// Versions per column when a read does not say ('all' or a positive number)
    #[arg(long, global = true, default_value = "1")]
    default_versions: VersionLimit,

    /// Log filter (overrides RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a table to the snapshot file, creating the file if needed
    Create {
        /// Layout JSON file
        #[arg(long)]
        layout: PathBuf,
    },
    /// Show a table's layout
    Layout { table: String },
    /// Compute the hex entity id of row key components
    EntityId {
        table: String,
        /// Components as JSON, e.g. '[12345]' or '"alice"'
        components: String,
    },
    /// Read a row
    Get {
        table: String,
        /// Hex entity id
        entity_id: String,
        /// Query string, e.g. 'cols=info:name&versions=all&timerange=0..10'
        #[arg(default_value = "")]
        params: String,
    },
    /// Write cells to a row
    Put {
        table: String,
        /// Hex entity id
        entity_id: String,
        /// Query string, e.g. 'info:name=alice&timestamp=1700000000000'
        params: String,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let kind = e.downcast_ref::<RowError>().map(RowError::kind);
            match kind {
                Some(ErrorKind::Client | ErrorKind::NotFound) => ExitCode::from(1),
                Some(ErrorKind::Server) | None => ExitCode::from(2),
            }
        }
    }
}

fn init_logging(directives: Option<&str>) -> Result<()> {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::WARN.into());
    let filter = match directives {
        Some(d) => builder.parse(d).with_context(|| format!("Invalid log filter: {}", d))?,
        None => builder.from_env_lossy(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    let config = Config::new(cli.tables.clone())
        .with_instance(cli.instance.clone())
        .with_default_versions(cli.default_versions)
        .with_output_format(cli.format.into())
        .with_pretty_json(cli.pretty);
    let formatter = OutputFactory::create(config.output_format, config.pretty_json);
    let mut stdout = std::io::stdout();

    if let Command::Create { layout } = &cli.command {
        let text = std::fs::read_to_string(layout)
            .with_context(|| format!("Failed to read layout: {}", layout.display()))?;
        let layout = TableLayout::from_json_str(&text)
            .with_context(|| format!("Failed to parse layout: {}", layout.display()))?;
        let store = if config.table_file.exists() {
            load(&config)?
        } else {
            InMemoryStore::new()
        };
        store.create_table(layout.clone())?;
        snapshot::save(&store, &config.table_file)
            .with_context(|| format!("Failed to save tables: {}", config.table_file.display()))?;
        return formatter.render_layout(&layout, &mut stdout);
    }

    let store = Arc::new(load(&config)?);
    let resource = RowResource::with_config(store.clone(), &config);

    match cli.command {
        Command::Create { .. } => Ok(()),
        Command::Layout { table } => {
            let layout = resource.layout(&table)?;
            formatter.render_layout(&layout, &mut stdout)
        }
        Command::EntityId { table, components } => {
            let entity_id = resource.entity_id(&table, &components)?;
            formatter.render_entity_id(&entity_id, &mut stdout)
        }
        Command::Get {
            table,
            entity_id,
            params,
        } => {
            let row = resource.get_row_with_params(&table, &entity_id, &params)?;
            formatter.render_row(&row, &mut stdout)
        }
        Command::Put {
            table,
            entity_id,
            params,
        } => {
            let locator = resource.put_row_with_params(&table, &entity_id, &params)?;
            snapshot::save(&store, &config.table_file)
                .with_context(|| format!("Failed to save tables: {}", config.table_file.display()))?;
            formatter.render_locator(&locator, resource.instance(), &mut stdout)
        }
    }
}

fn load(config: &Config) -> Result<InMemoryStore> {
    snapshot::load(&config.table_file)
        .with_context(|| format!("Failed to load tables: {}", config.table_file.display()))
}
