use crate::error::{EtlError, Result};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// A single typed value in a [`Table`].
#[derive(Debug, Clone)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

// Reals compare by bit pattern so that rows containing them can be hashed for dedup.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Null, Cell::Null) => true,
            (Cell::Integer(a), Cell::Integer(b)) => a == b,
            (Cell::Real(a), Cell::Real(b)) => a.to_bits() == b.to_bits(),
            (Cell::Text(a), Cell::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Null => {}
            Cell::Integer(v) => v.hash(state),
            Cell::Real(v) => v.to_bits().hash(state),
            Cell::Text(v) => v.hash(state),
        }
    }
}

/// Storage class of a column, used when creating the SQLite table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Text => "TEXT",
        }
    }
}

/// In-memory rows with a named header. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from raw text fields, inferring one type per column.
    ///
    /// Empty fields become [`Cell::Null`]. A column is integer when every
    /// non-empty field parses as `i64`, real when every one parses as `f64`,
    /// and text otherwise.
    pub fn from_text_rows(columns: Vec<String>, raw: Vec<Vec<String>>) -> Self {
        let kinds: Vec<ColumnKind> = (0..columns.len())
            .map(|idx| infer_kind(raw.iter().map(|r| r[idx].as_str())))
            .collect();

        let rows = raw
            .into_iter()
            .map(|fields| {
                fields
                    .into_iter()
                    .zip(&kinds)
                    .map(|(field, kind)| typed_cell(field, *kind))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`Table::column_index`] but reports which table lacked the column.
    pub fn require_column(&self, name: &str, source_name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| EtlError::MissingColumn {
            column: name.to_string(),
            source_name: source_name.to_string(),
        })
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Storage class per column: the widest kind seen among non-null cells.
    /// All-null columns are reported as text.
    pub fn column_kinds(&self) -> Vec<ColumnKind> {
        (0..self.columns.len())
            .map(|idx| {
                let mut kind: Option<ColumnKind> = None;
                for row in &self.rows {
                    let cell_kind = match &row[idx] {
                        Cell::Null => continue,
                        Cell::Integer(_) => ColumnKind::Integer,
                        Cell::Real(_) => ColumnKind::Real,
                        Cell::Text(_) => ColumnKind::Text,
                    };
                    kind = Some(match (kind, cell_kind) {
                        (None, k) => k,
                        (Some(ColumnKind::Text), _) | (_, ColumnKind::Text) => ColumnKind::Text,
                        (Some(ColumnKind::Real), _) | (_, ColumnKind::Real) => ColumnKind::Real,
                        _ => ColumnKind::Integer,
                    });
                }
                kind.unwrap_or(ColumnKind::Text)
            })
            .collect()
    }

    /// Remove exact-duplicate rows, keeping the first occurrence of each.
    pub fn drop_duplicates(self) -> Self {
        let mut seen: HashSet<Vec<Cell>> = HashSet::with_capacity(self.rows.len());
        let rows = self
            .rows
            .into_iter()
            .filter(|row| seen.insert(row.clone()))
            .collect();
        Self {
            columns: self.columns,
            rows,
        }
    }
}

fn infer_kind<'a>(fields: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut all_int = true;
    let mut all_real = true;
    for field in fields.filter(|f| !f.is_empty()) {
        if all_int && field.parse::<i64>().is_err() {
            all_int = false;
        }
        if field.parse::<f64>().is_err() {
            all_real = false;
            break;
        }
    }
    if all_int {
        ColumnKind::Integer
    } else if all_real {
        ColumnKind::Real
    } else {
        ColumnKind::Text
    }
}

fn typed_cell(field: String, kind: ColumnKind) -> Cell {
    if field.is_empty() {
        return Cell::Null;
    }
    match kind {
        ColumnKind::Integer => field.parse().map(Cell::Integer).unwrap_or(Cell::Text(field)),
        ColumnKind::Real => field.parse().map(Cell::Real).unwrap_or(Cell::Text(field)),
        ColumnKind::Text => Cell::Text(field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infers_column_types() {
        let table = Table::from_text_rows(
            strings(&["id", "score", "message"]),
            vec![
                strings(&["1", "0.5", "hello"]),
                strings(&["2", "3", ""]),
            ],
        );

        assert_eq!(table.rows()[0][0], Cell::Integer(1));
        assert_eq!(table.rows()[1][1], Cell::Real(3.0));
        assert_eq!(table.rows()[1][2], Cell::Null);
        assert_eq!(
            table.column_kinds(),
            vec![ColumnKind::Integer, ColumnKind::Real, ColumnKind::Text]
        );
    }

    #[test]
    fn test_drop_duplicates_keeps_first_occurrence_order() {
        let mut table = Table::new(strings(&["id", "genre"]));
        table.push_row(vec![Cell::Integer(2), Cell::Text("news".into())]);
        table.push_row(vec![Cell::Integer(1), Cell::Text("direct".into())]);
        table.push_row(vec![Cell::Integer(2), Cell::Text("news".into())]);
        table.push_row(vec![Cell::Integer(2), Cell::Text("social".into())]);

        let deduped = table.drop_duplicates();
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped.rows()[0][0], Cell::Integer(2));
        assert_eq!(deduped.rows()[2][1], Cell::Text("social".into()));

        let again = deduped.clone().drop_duplicates();
        assert_eq!(again, deduped);
    }

    #[test]
    fn test_all_null_column_is_text() {
        let table = Table::from_text_rows(strings(&["original"]), vec![strings(&[""])]);
        assert_eq!(table.column_kinds(), vec![ColumnKind::Text]);
    }
}
