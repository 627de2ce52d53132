//! Configuration handling for rowgate

use std::path::PathBuf;

use crate::query::VersionLimit;

/// How rows and layouts are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(OutputFormat::Terminal),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Configuration of the row resource and the CLI
#[derive(Debug, Clone)]
pub struct Config {
    /// Snapshot file holding the tables
    pub table_file: PathBuf,
    /// Instance name used in row locators
    pub instance: String,
    /// Version cap for reads that do not give `versions`
    pub default_versions: VersionLimit,
    /// Output format
    pub output_format: OutputFormat,
    /// Indent JSON output
    pub pretty_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_file: PathBuf::new(),
            instance: "default".to_string(),
            default_versions: VersionLimit::default(),
            output_format: OutputFormat::default(),
            pretty_json: false,
        }
    }
}

impl Config {
    /// Create a new Config for a snapshot file
    pub fn new(table_file: PathBuf) -> Self {
        Self {
            table_file,
            ..Default::default()
        }
    }

    /// Set the instance name
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    /// Set the default version cap
    pub fn with_default_versions(mut self, versions: VersionLimit) -> Self {
        self.default_versions = versions;
        self
    }

    /// Set output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = pretty;
        self
    }
}
