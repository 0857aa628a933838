use clap::Parser;
use disaster_etl::cli::Cli;
use disaster_etl::config::EtlConfig;
use disaster_etl::constants::USAGE;
use disaster_etl::logging;
use disaster_etl::pipeline::Pipeline;
use std::io;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Wrong argument count: explain and stop before touching any file
    let Some(paths) = cli.etl_paths() else {
        println!("{USAGE}");
        return Ok(());
    };

    // Load environment variables
    dotenv::dotenv().ok();

    let mut config = EtlConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config)?;

    let _log_guard = logging::init_logging(config.log_dir.as_deref())?;
    info!(
        table = %config.table_name,
        if_exists = ?config.if_exists,
        indicators = ?config.indicators,
        "Starting ETL run"
    );

    // With --json, stdout carries only the summary
    let result = if cli.json {
        Pipeline::run_with_progress(&config, &paths, &mut io::stderr())?
    } else {
        Pipeline::run(&config, &paths)?
    };
    info!(
        run_id = %result.run_id,
        written = result.written_rows,
        duplicates = result.duplicate_rows,
        "ETL run finished"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}
