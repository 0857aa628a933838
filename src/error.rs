use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Log file setup failed: {0}")]
    LogInit(#[from] tracing_appender::rolling::InitError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required column '{column}' in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("Cannot derive categories from an empty table")]
    EmptyTable,

    #[error("First row has an empty categories string")]
    EmptyCategories,

    #[error("Row {row} has {found} category segments, expected {expected}")]
    CategoryArity {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Category segment '{segment}' does not yield a column name")]
    InvalidCategoryName { segment: String },

    #[error("Invalid indicator in segment '{segment}' (row {row})")]
    InvalidIndicator { segment: String, row: usize },

    #[error("Column '{0}' would appear twice in the cleaned table")]
    DuplicateColumn(String),

    #[error("Table '{0}' already exists")]
    TableExists(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;
