use crate::config::EtlConfig;
use crate::error::Result;
use crate::loader::{delimiter_byte, load_data};
use crate::storage::SqliteStore;
use crate::table::Table;
use crate::transform::{clean_data, CleanOptions};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

/// Input and output locations for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtlPaths {
    pub messages: PathBuf,
    pub categories: PathBuf,
    pub database: PathBuf,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub messages_rows: usize,
    pub categories_rows: usize,
    pub joined_rows: usize,
    pub duplicate_rows: usize,
    pub written_rows: usize,
    pub columns: Vec<String>,
    pub table_name: String,
    pub database: String,
}

pub struct Pipeline;

impl Pipeline {
    /// Load, clean and persist in one pass, reporting progress on stdout.
    pub fn run(config: &EtlConfig, paths: &EtlPaths) -> Result<PipelineResult> {
        Self::run_with_progress(config, paths, &mut io::stdout())
    }

    /// Same as [`Pipeline::run`] with the progress lines sent to `progress`.
    /// Any stage failure aborts the run.
    #[instrument(skip(config, paths, progress), fields(database = %paths.database.display()))]
    pub fn run_with_progress(
        config: &EtlConfig,
        paths: &EtlPaths,
        progress: &mut dyn Write,
    ) -> Result<PipelineResult> {
        config.validate()?;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        writeln!(
            progress,
            "Loading data...\n    MESSAGES: {}\n    CATEGORIES: {}",
            paths.messages.display(),
            paths.categories.display()
        )?;
        let stage = Instant::now();
        let (joined, loaded) =
            load_data(&paths.messages, &paths.categories, delimiter_byte(config.delimiter)?)?;
        record_stage("load", stage);
        counter!("etl_rows_loaded_total", "source" => "messages").increment(loaded.messages as u64);
        counter!("etl_rows_loaded_total", "source" => "categories").increment(loaded.categories as u64);
        counter!("etl_rows_joined_total").increment(joined.len() as u64);
        let joined_rows = joined.len();

        writeln!(progress, "Cleaning data...")?;
        let stage = Instant::now();
        let expanded_rows = joined.len();
        let cleaned = clean_data(
            joined,
            CleanOptions {
                separator: config.category_separator,
                indicators: config.indicators,
            },
        )?;
        record_stage("clean", stage);
        let duplicate_rows = expanded_rows - cleaned.len();
        counter!("etl_duplicate_rows_total").increment(duplicate_rows as u64);

        writeln!(progress, "Saving data...\n    DATABASE: {}", paths.database.display())?;
        let stage = Instant::now();
        let written_rows = persist(&cleaned, &paths.database, config)?;
        record_stage("persist", stage);
        counter!("etl_rows_written_total").increment(written_rows as u64);

        writeln!(progress, "Cleaned data saved to database!")?;

        Ok(PipelineResult {
            run_id,
            started_at,
            finished_at: Utc::now(),
            messages_rows: loaded.messages,
            categories_rows: loaded.categories,
            joined_rows,
            duplicate_rows,
            written_rows,
            columns: cleaned.columns().to_vec(),
            table_name: config.table_name.clone(),
            database: paths.database.display().to_string(),
        })
    }
}

fn persist(table: &Table, database: &Path, config: &EtlConfig) -> Result<usize> {
    let mut store = SqliteStore::open(database)?;
    let written = store.write_table(table, &config.table_name, config.if_exists)?;
    let stored = store.row_count(&config.table_name)?;
    info!(written, stored, table = %config.table_name, "Persisted cleaned data");
    Ok(written)
}

fn record_stage(stage: &'static str, started: Instant) {
    let elapsed = started.elapsed().as_secs_f64();
    histogram!("etl_stage_duration_seconds", "stage" => stage).record(elapsed);
    info!(stage, elapsed_secs = elapsed, "Stage finished");
}
