use crate::constants::{ID_COLUMN, LEFT_SUFFIX, RIGHT_SUFFIX};
use crate::error::{EtlError, Result};
use crate::table::{Cell, Table};
use csv::{ReaderBuilder, Trim};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Read a delimited file with a header row into a [`Table`].
#[instrument(fields(path = %path.display()))]
pub fn read_table(path: &Path, delimiter: u8) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::Headers)
        .from_path(path)?;

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut raw = Vec::new();
    for record in reader.records() {
        let record = record?;
        raw.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    debug!("Read {} rows with {} columns", raw.len(), columns.len());
    Ok(Table::from_text_rows(columns, raw))
}

/// Row counts of the two input files before the join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadCounts {
    pub messages: usize,
    pub categories: usize,
}

/// Load messages and categories and inner-join them on `id`.
#[instrument(fields(messages = %messages_path.display(), categories = %categories_path.display()))]
pub fn load_data(messages_path: &Path, categories_path: &Path, delimiter: u8) -> Result<(Table, LoadCounts)> {
    let messages = read_table(messages_path, delimiter)?;
    let categories = read_table(categories_path, delimiter)?;
    let counts = LoadCounts {
        messages: messages.len(),
        categories: categories.len(),
    };
    info!(
        messages = counts.messages,
        categories = counts.categories,
        "Loaded input files"
    );
    let joined = join_on_id(
        &messages,
        &categories,
        &messages_path.display().to_string(),
        &categories_path.display().to_string(),
    )?;
    Ok((joined, counts))
}

/// Inner join on the `id` column.
///
/// Output order follows the left table; each left row is paired with every
/// right row sharing its key, in right-table order. The right key column is
/// dropped, and other columns present on both sides get `_x` / `_y` suffixes.
pub fn join_on_id(left: &Table, right: &Table, left_name: &str, right_name: &str) -> Result<Table> {
    let left_key = left.require_column(ID_COLUMN, left_name)?;
    let right_key = right.require_column(ID_COLUMN, right_name)?;

    let right_keep: Vec<usize> = (0..right.columns().len())
        .filter(|&idx| idx != right_key)
        .collect();

    let mut columns: Vec<String> = left
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let shared = idx != left_key
                && right_keep.iter().any(|&r| &right.columns()[r] == name);
            if shared {
                format!("{name}{LEFT_SUFFIX}")
            } else {
                name.clone()
            }
        })
        .collect();
    for &idx in &right_keep {
        let name = &right.columns()[idx];
        let shared = left
            .columns()
            .iter()
            .enumerate()
            .any(|(l, n)| l != left_key && n == name);
        if shared {
            columns.push(format!("{name}{RIGHT_SUFFIX}"));
        } else {
            columns.push(name.clone());
        }
    }

    // Null keys never match, same as a SQL inner join
    let mut index: HashMap<Cell, Vec<usize>> = HashMap::new();
    for (row_idx, row) in right.rows().iter().enumerate() {
        let key = join_key(&row[right_key]);
        if !key.is_null() {
            index.entry(key).or_default().push(row_idx);
        }
    }

    let mut joined = Table::new(columns);
    for row in left.rows() {
        let Some(matches) = index.get(&join_key(&row[left_key])) else {
            continue;
        };
        for &right_idx in matches {
            let right_row = &right.rows()[right_idx];
            let mut out = row.clone();
            out.extend(right_keep.iter().map(|&idx| right_row[idx].clone()));
            joined.push_row(out);
        }
    }

    if joined.is_empty() && !left.is_empty() && !right.is_empty() {
        debug!("No ids matched between {} and {}", left_name, right_name);
    }
    Ok(joined)
}

/// Key used for matching: integral reals compare equal to the same integer,
/// so an id read as `1.0` on one side still joins with `1` on the other.
fn join_key(cell: &Cell) -> Cell {
    match cell {
        Cell::Real(v) if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 => {
            Cell::Integer(*v as i64)
        }
        other => other.clone(),
    }
}

pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(EtlError::Config(format!(
            "delimiter must be a single ASCII character, got '{delimiter}'"
        )))
    }
}
