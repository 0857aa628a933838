use crate::constants::{DEFAULT_CATEGORY_SEPARATOR, DEFAULT_DELIMITER, DEFAULT_TABLE_NAME};
use crate::error::{EtlError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What to do when the destination table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IfExists {
    Fail,
    #[default]
    Replace,
    Append,
}

impl FromStr for IfExists {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(IfExists::Fail),
            "replace" => Ok(IfExists::Replace),
            "append" => Ok(IfExists::Append),
            other => Err(EtlError::Config(format!("unknown if-exists policy '{other}'"))),
        }
    }
}

/// How the last character of a category segment becomes an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorPolicy {
    /// Keep the digit as written, so `related-2` stays 2
    #[default]
    PassThrough,
    /// Any non-zero digit becomes 1
    Binarize,
    /// Only 0 and 1 are accepted
    Strict,
}

impl FromStr for IndicatorPolicy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pass_through" | "passthrough" => Ok(IndicatorPolicy::PassThrough),
            "binarize" => Ok(IndicatorPolicy::Binarize),
            "strict" => Ok(IndicatorPolicy::Strict),
            other => Err(EtlError::Config(format!("unknown indicator policy '{other}'"))),
        }
    }
}

/// Settings for one ETL run.
///
/// Layered as defaults, then an optional TOML file, then `ETL_*`
/// environment variables, then command line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub table_name: String,
    pub if_exists: IfExists,
    pub indicators: IndicatorPolicy,
    pub delimiter: char,
    pub category_separator: char,
    pub log_dir: Option<PathBuf>,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            if_exists: IfExists::default(),
            indicators: IndicatorPolicy::default(),
            delimiter: DEFAULT_DELIMITER,
            category_separator: DEFAULT_CATEGORY_SEPARATOR,
            log_dir: None,
        }
    }
}

impl EtlConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EtlConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Defaults or the given file, then the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => match std::env::var("ETL_CONFIG") {
                Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from `ETL_*` variables resolved through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("ETL_TABLE_NAME") {
            self.table_name = v.trim().to_string();
        }
        if let Some(v) = get("ETL_IF_EXISTS") {
            self.if_exists = v.parse()?;
        }
        if let Some(v) = get("ETL_INDICATOR_POLICY") {
            self.indicators = v.parse()?;
        }
        if let Some(v) = get("ETL_DELIMITER") {
            self.delimiter = single_char("ETL_DELIMITER", &v)?;
        }
        if let Some(v) = get("ETL_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v.trim()));
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(EtlError::Config("table name must not be empty".to_string()));
        }
        if !self.delimiter.is_ascii() {
            return Err(EtlError::Config(format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )));
        }
        if self.delimiter == self.category_separator {
            return Err(EtlError::Config(
                "delimiter and category separator must differ".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn single_char(name: &str, value: &str) -> Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(EtlError::Config(format!(
            "{name} must be exactly one character, got '{value}'"
        ))),
    }
}
