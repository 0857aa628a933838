use anyhow::Result;
use disaster_etl::config::{EtlConfig, IfExists, IndicatorPolicy};
use disaster_etl::error::EtlError;
use disaster_etl::pipeline::{EtlPaths, Pipeline};
use disaster_etl::storage::SqliteStore;
use disaster_etl::table::Cell;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

const MESSAGES: &str = "\
id,message,original,genre
2,Weather update - a cold front from Cuba that could pass over Haiti,Un front froid se retrouve sur Cuba,direct
7,Is the Hurricane over or is it not over,Cyclone nan fini osinon li pa fini,direct
8,Looking for someone but no name,,direct
9,UN reports Leogane 80-90 destroyed.,,direct
";

const CATEGORIES: &str = "\
id,categories
2,related-1;request-0;offer-0;aid_related-0
7,related-1;request-0;offer-0;aid_related-1
8,related-1;request-0;offer-0;aid_related-0
8,related-1;request-0;offer-0;aid_related-0
9,related-2;request-0;offer-0;aid_related-0
11,related-1;request-1;offer-0;aid_related-1
";

fn fixtures(dir: &Path) -> Result<EtlPaths> {
    let messages = dir.join("disaster_messages.csv");
    let categories = dir.join("disaster_categories.csv");
    fs::write(&messages, MESSAGES)?;
    fs::write(&categories, CATEGORIES)?;
    Ok(EtlPaths {
        messages,
        categories,
        database: dir.join("DisasterResponse.db"),
    })
}

#[test]
fn test_full_run_writes_cleaned_table() -> Result<()> {
    let temp_dir = tempdir()?;
    let paths = fixtures(temp_dir.path())?;

    let result = Pipeline::run(&EtlConfig::default(), &paths)?;

    // id 8 matches twice with identical categories, id 11 has no message
    assert_eq!(result.messages_rows, 4);
    assert_eq!(result.categories_rows, 6);
    assert_eq!(result.joined_rows, 5);
    assert_eq!(result.duplicate_rows, 1);
    assert_eq!(result.written_rows, 4);
    assert_eq!(
        result.columns,
        vec!["id", "message", "original", "genre", "related", "request", "offer", "aid_related"]
    );

    let conn = Connection::open(&paths.database)?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages_cleaned", [], |r| r.get(0))?;
    assert_eq!(count, 4);

    let aid: i64 = conn.query_row(
        "SELECT aid_related FROM messages_cleaned WHERE id = 7",
        [],
        |r| r.get(0),
    )?;
    assert_eq!(aid, 1);

    // every category column is stored as an integer, not only the last one
    let mut stmt = conn.prepare("SELECT typeof(related), typeof(request), typeof(offer) FROM messages_cleaned")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for idx in 0..3 {
            let kind: String = row.get(idx)?;
            assert_eq!(kind, "integer");
        }
    }
    Ok(())
}

#[test]
fn test_read_back_matches_columns_and_rows() -> Result<()> {
    let temp_dir = tempdir()?;
    let paths = fixtures(temp_dir.path())?;

    let result = Pipeline::run(&EtlConfig::default(), &paths)?;

    let store = SqliteStore::open(&paths.database)?;
    let stored = store.read_table("messages_cleaned")?;
    assert_eq!(stored.len(), result.written_rows);
    assert_eq!(stored.columns(), result.columns.as_slice());

    let original = stored.column_index("original").unwrap();
    assert_eq!(stored.rows()[2][original], Cell::Null);
    Ok(())
}

#[test]
fn test_related_two_is_kept_or_binarized() -> Result<()> {
    let temp_dir = tempdir()?;
    let paths = fixtures(temp_dir.path())?;

    Pipeline::run(&EtlConfig::default(), &paths)?;
    let conn = Connection::open(&paths.database)?;
    let related: i64 = conn.query_row("SELECT related FROM messages_cleaned WHERE id = 9", [], |r| r.get(0))?;
    assert_eq!(related, 2);
    drop(conn);

    let config = EtlConfig {
        indicators: IndicatorPolicy::Binarize,
        ..EtlConfig::default()
    };
    Pipeline::run(&config, &paths)?;
    let conn = Connection::open(&paths.database)?;
    let related: i64 = conn.query_row("SELECT related FROM messages_cleaned WHERE id = 9", [], |r| r.get(0))?;
    assert_eq!(related, 1);

    let strict = EtlConfig {
        indicators: IndicatorPolicy::Strict,
        ..EtlConfig::default()
    };
    let err = Pipeline::run(&strict, &paths).unwrap_err();
    assert!(matches!(err, EtlError::InvalidIndicator { .. }));
    Ok(())
}

#[test]
fn test_custom_table_name_and_fail_policy() -> Result<()> {
    let temp_dir = tempdir()?;
    let paths = fixtures(temp_dir.path())?;
    let config = EtlConfig {
        table_name: "disaster messages".to_string(),
        if_exists: IfExists::Fail,
        ..EtlConfig::default()
    };

    Pipeline::run(&config, &paths)?;
    let err = Pipeline::run(&config, &paths).unwrap_err();
    assert!(matches!(err, EtlError::TableExists(ref t) if t == "disaster messages"));

    let store = SqliteStore::open(&paths.database)?;
    assert_eq!(store.row_count("disaster messages")?, 4);
    Ok(())
}

#[test]
fn test_missing_input_fails_without_output() -> Result<()> {
    let temp_dir = tempdir()?;
    let mut paths = fixtures(temp_dir.path())?;
    paths.categories = temp_dir.path().join("missing.csv");

    let err = Pipeline::run(&EtlConfig::default(), &paths).unwrap_err();
    assert!(matches!(err, EtlError::Csv(_)));
    assert!(!paths.database.exists());
    Ok(())
}

#[test]
fn test_cli_with_two_arguments_prints_usage() -> Result<()> {
    let temp_dir = tempdir()?;
    let paths = fixtures(temp_dir.path())?;

    let output = Command::new(env!("CARGO_BIN_EXE_process_data"))
        .arg(&paths.messages)
        .arg(&paths.categories)
        .current_dir(temp_dir.path())
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Please provide the filepaths of the messages and categories"));
    assert!(!paths.database.exists());
    let entries = fs::read_dir(temp_dir.path())?.count();
    assert_eq!(entries, 2);
    Ok(())
}

#[test]
fn test_cli_end_to_end_with_json_summary() -> Result<()> {
    let temp_dir = tempdir()?;
    let paths = fixtures(temp_dir.path())?;

    let output = Command::new(env!("CARGO_BIN_EXE_process_data"))
        .arg(&paths.messages)
        .arg(&paths.categories)
        .arg(&paths.database)
        .arg("--json")
        .current_dir(temp_dir.path())
        .env_remove("ETL_CONFIG")
        .env_remove("ETL_TABLE_NAME")
        .env_remove("ETL_LOG_DIR")
        .output()?;

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(summary["written_rows"], 4);
    assert_eq!(summary["messages_rows"], 4);
    assert_eq!(summary["table_name"], "messages_cleaned");
    assert!(paths.database.exists());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cleaned data saved to database!"));
    Ok(())
}

#[test]
fn test_progress_lines_go_to_the_given_writer() -> Result<()> {
    let temp_dir = tempdir()?;
    let paths = fixtures(temp_dir.path())?;

    let mut progress = Vec::new();
    Pipeline::run_with_progress(&EtlConfig::default(), &paths, &mut progress)?;

    let text = String::from_utf8(progress)?;
    assert!(text.starts_with("Loading data..."));
    assert!(text.contains("Cleaning data..."));
    assert!(text.contains("DATABASE: "));
    assert!(text.ends_with("Cleaned data saved to database!\n"));
    Ok(())
}

#[test]
fn test_cli_reports_unusable_log_dir_as_error() -> Result<()> {
    let temp_dir = tempdir()?;
    let paths = fixtures(temp_dir.path())?;
    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, "not a directory")?;

    let output = Command::new(env!("CARGO_BIN_EXE_process_data"))
        .arg(&paths.messages)
        .arg(&paths.categories)
        .arg(&paths.database)
        .current_dir(temp_dir.path())
        .env_remove("ETL_CONFIG")
        .env("ETL_LOG_DIR", blocker.join("logs"))
        .output()?;

    // a clean error exit, not a panic
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("panicked"));
    assert!(!paths.database.exists());
    Ok(())
}
