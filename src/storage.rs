use crate::config::IfExists;
use crate::error::{EtlError, Result};
use crate::table::{Cell, Table};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection};
use std::path::Path;
use tracing::{debug, info, instrument};

/// SQLite file holding the cleaned output table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at exactly `db_path`.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        debug!("Opened SQLite store at {}", db_path.display());
        Ok(Self { conn })
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        let mut rows = stmt.query(params![table_name])?;
        Ok(rows.next()?.is_some())
    }

    /// Write `table` under `table_name`, creating it from the table's column kinds.
    ///
    /// All rows go in through one transaction; the table is created (or
    /// dropped and recreated for [`IfExists::Replace`]) inside it.
    #[instrument(skip(self, table), fields(rows = table.len(), columns = table.columns().len()))]
    pub fn write_table(&mut self, table: &Table, table_name: &str, if_exists: IfExists) -> Result<usize> {
        let exists = self.table_exists(table_name)?;
        if exists && if_exists == IfExists::Fail {
            return Err(EtlError::TableExists(table_name.to_string()));
        }

        let quoted_table = quote_ident(table_name);
        let tx = self.conn.transaction()?;

        if exists && if_exists == IfExists::Replace {
            tx.execute_batch(&format!("DROP TABLE {quoted_table};"))?;
        }
        if !exists || if_exists == IfExists::Replace {
            let column_defs: Vec<String> = table
                .columns()
                .iter()
                .zip(table.column_kinds())
                .map(|(name, kind)| format!("{} {}", quote_ident(name), kind.sql_type()))
                .collect();
            tx.execute_batch(&format!(
                "CREATE TABLE {quoted_table} ({});",
                column_defs.join(", ")
            ))?;
        }

        let column_list: Vec<String> = table.columns().iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=table.columns().len()).map(|i| format!("?{i}")).collect();
        let insert_sql = format!(
            "INSERT INTO {quoted_table} ({}) VALUES ({})",
            column_list.join(", "),
            placeholders.join(", ")
        );

        let mut written = 0usize;
        {
            let mut stmt = tx.prepare(&insert_sql)?;
            for row in table.rows() {
                written += stmt.execute(params_from_iter(row.iter().map(to_sql_value)))?;
            }
        }
        tx.commit()?;

        info!(table = table_name, rows = written, "Wrote table");
        Ok(written)
    }

    pub fn row_count(&self, table_name: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table_name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Read a stored table back in rowid order.
    pub fn read_table(&self, table_name: &str) -> Result<Table> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(table_name)))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut table = Table::new(columns);
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(width);
            for idx in 0..width {
                cells.push(from_sql_value(row.get_ref(idx)?));
            }
            table.push_row(cells);
        }
        Ok(table)
    }
}

/// Double-quote an identifier, doubling any embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Integer(v) => Value::Integer(*v),
        Cell::Real(v) => Value::Real(*v),
        Cell::Text(v) => Value::Text(v.clone()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(v) => Cell::Integer(v),
        ValueRef::Real(v) => Cell::Real(v),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Cell::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cleaned() -> Table {
        let mut table = Table::new(vec![
            "id".to_string(),
            "message".to_string(),
            "original".to_string(),
            "related".to_string(),
        ]);
        table.push_row(vec![
            Cell::Integer(2),
            Cell::Text("Weather update".into()),
            Cell::Null,
            Cell::Integer(1),
        ]);
        table.push_row(vec![
            Cell::Integer(7),
            Cell::Text("Is the \"Hurricane\" over?".into()),
            Cell::Text("Cyclone nan fini".into()),
            Cell::Integer(0),
        ]);
        table
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("out.db")).unwrap();

        let table = cleaned();
        let written = store.write_table(&table, "messages_cleaned", IfExists::Fail).unwrap();
        assert_eq!(written, 2);

        let back = store.read_table("messages_cleaned").unwrap();
        assert_eq!(back, table);
        assert_eq!(store.row_count("messages_cleaned").unwrap(), 2);
    }

    #[test]
    fn test_if_exists_policies() {
        let dir = tempdir().unwrap();
        let mut store = SqliteStore::open(dir.path().join("out.db")).unwrap();
        let table = cleaned();

        store.write_table(&table, "t", IfExists::Replace).unwrap();
        assert!(matches!(
            store.write_table(&table, "t", IfExists::Fail),
            Err(EtlError::TableExists(_))
        ));

        store.write_table(&table, "t", IfExists::Append).unwrap();
        assert_eq!(store.row_count("t").unwrap(), 4);

        store.write_table(&table, "t", IfExists::Replace).unwrap();
        assert_eq!(store.row_count("t").unwrap(), 2);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("Disaster.db");
        let mut store = SqliteStore::open(&path).unwrap();
        store.write_table(&cleaned(), "messages_cleaned", IfExists::Replace).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("aid_related"), "\"aid_related\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
