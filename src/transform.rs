//! Expansion of the packed `categories` column into integer indicator columns.

use crate::config::IndicatorPolicy;
use crate::constants::{CATEGORIES_COLUMN, CATEGORY_VALUE_SUFFIX_LEN};
use crate::error::{EtlError, Result};
use crate::table::{Cell, Table};
use tracing::{debug, info, instrument};

/// Options for [`clean_data`].
#[derive(Debug, Clone, Copy)]
pub struct CleanOptions {
    pub separator: char,
    pub indicators: IndicatorPolicy,
}

pub fn split_categories(packed: &str, separator: char) -> Vec<&str> {
    if packed.is_empty() {
        return Vec::new();
    }
    packed.split(separator).collect()
}

/// Column names from the first row's segments: each segment minus its `-N` suffix.
pub fn category_names(segments: &[&str]) -> Result<Vec<String>> {
    if segments.is_empty() {
        return Err(EtlError::EmptyCategories);
    }
    segments
        .iter()
        .map(|segment| {
            let keep = segment.chars().count().saturating_sub(CATEGORY_VALUE_SUFFIX_LEN);
            let name: String = segment.chars().take(keep).collect();
            if name.is_empty() {
                Err(EtlError::InvalidCategoryName {
                    segment: segment.to_string(),
                })
            } else {
                Ok(name)
            }
        })
        .collect()
}

/// Raw value of a segment: its last character as a digit.
pub fn raw_indicator(segment: &str) -> Option<u32> {
    segment.chars().last().and_then(|c| c.to_digit(10))
}

/// Integer indicator for one segment under the given policy.
pub fn indicator_value(segment: &str, policy: IndicatorPolicy, row: usize) -> Result<i64> {
    let invalid = || EtlError::InvalidIndicator {
        segment: segment.to_string(),
        row,
    };
    let digit = raw_indicator(segment).ok_or_else(invalid)?;
    match policy {
        IndicatorPolicy::PassThrough => Ok(i64::from(digit)),
        IndicatorPolicy::Binarize => Ok(i64::from(digit != 0)),
        IndicatorPolicy::Strict if digit <= 1 => Ok(i64::from(digit)),
        IndicatorPolicy::Strict => Err(invalid()),
    }
}

/// Replace the packed categories column with one integer column per category,
/// then drop exact-duplicate rows.
///
/// The category schema comes from the first row; every other row must carry
/// the same number of segments. Category columns are appended after the
/// remaining input columns in the order they appear in the packed string.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn clean_data(table: Table, options: CleanOptions) -> Result<Table> {
    let cat_idx = table.require_column(CATEGORIES_COLUMN, "joined table")?;
    let first = table.rows().first().ok_or(EtlError::EmptyTable)?;

    let names = category_names(&split_categories(packed_text(&first[cat_idx]), options.separator))?;
    debug!("Derived {} category columns", names.len());

    let mut columns: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != cat_idx)
        .map(|(_, name)| name.clone())
        .collect();
    for name in &names {
        if columns.contains(name) {
            return Err(EtlError::DuplicateColumn(name.clone()));
        }
        columns.push(name.clone());
    }

    let mut expanded = Table::new(columns);
    for (row_idx, row) in table.rows().iter().enumerate() {
        let segments = split_categories(packed_text(&row[cat_idx]), options.separator);
        if segments.len() != names.len() {
            return Err(EtlError::CategoryArity {
                row: row_idx,
                expected: names.len(),
                found: segments.len(),
            });
        }

        let mut out: Vec<Cell> = row
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != cat_idx)
            .map(|(_, cell)| cell.clone())
            .collect();
        for segment in segments {
            out.push(Cell::Integer(indicator_value(segment, options.indicators, row_idx)?));
        }
        expanded.push_row(out);
    }

    let before = expanded.len();
    let cleaned = expanded.drop_duplicates();
    info!(
        categories = names.len(),
        duplicates = before - cleaned.len(),
        rows = cleaned.len(),
        "Expanded categories and removed duplicates"
    );
    Ok(cleaned)
}

// A null cell behaves like an empty packed string.
fn packed_text(cell: &Cell) -> &str {
    cell.as_text().unwrap_or("")
}
