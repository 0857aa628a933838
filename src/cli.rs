use crate::config::{single_char, EtlConfig, IfExists, IndicatorPolicy};
use crate::error::Result;
use crate::pipeline::EtlPaths;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "process_data")]
#[command(about = "Merge disaster messages with their categories and save the cleaned table to SQLite")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// <messages_filepath> <categories_filepath> <database_filepath>
    #[arg(value_name = "PATH", num_args = 0..)]
    pub paths: Vec<PathBuf>,

    /// Destination table name
    #[arg(long)]
    pub table: Option<String>,

    /// Behaviour when the table already exists
    #[arg(long, value_enum)]
    pub if_exists: Option<IfExists>,

    /// How category values other than 0 and 1 are handled
    #[arg(long, value_enum)]
    pub indicators: Option<IndicatorPolicy>,

    /// Field delimiter of both input files
    #[arg(long)]
    pub delimiter: Option<String>,

    /// TOML configuration file (falls back to ETL_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// The three positional paths, or `None` when any other count was given.
    pub fn etl_paths(&self) -> Option<EtlPaths> {
        match self.paths.as_slice() {
            [messages, categories, database] => Some(EtlPaths {
                messages: messages.clone(),
                categories: categories.clone(),
                database: database.clone(),
            }),
            _ => None,
        }
    }

    /// Flags take precedence over everything `EtlConfig::load` resolved.
    pub fn apply_overrides(&self, config: &mut EtlConfig) -> Result<()> {
        if let Some(table) = &self.table {
            config.table_name = table.clone();
        }
        if let Some(if_exists) = self.if_exists {
            config.if_exists = if_exists;
        }
        if let Some(indicators) = self.indicators {
            config.indicators = indicators;
        }
        if let Some(delimiter) = &self.delimiter {
            config.delimiter = single_char("--delimiter", delimiter)?;
        }
        config.validate()
    }
}
