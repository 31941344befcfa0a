//! `SQLite` driver for relational sources.
//!
//! Each call opens its own read-only connection, so one backend value can
//! serve concurrent sessions without sharing a `rusqlite::Connection`
//! (which is `!Sync`).

use std::fmt::Write;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Map, Value};

use super::SqlBackend;
use crate::catalog::SqlEngine;
use crate::error::BackendError;

/// Maximum rows serialized into a tool result.
const MAX_ROWS: usize = 200;

/// Read-only `SQLite` backend.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    source_name: String,
    path: PathBuf,
}

impl SqliteBackend {
    /// Opens the database once to confirm it is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Connection`] if the file cannot be opened.
    pub fn open(source_name: &str, path: &Path) -> Result<Self, BackendError> {
        let backend = Self {
            source_name: source_name.to_string(),
            path: path.to_path_buf(),
        };
        backend.connect()?;
        Ok(backend)
    }

    fn connect(&self) -> Result<Connection, BackendError> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| BackendError::Connection {
            source_name: self.source_name.clone(),
            message: e.to_string(),
        })
    }

    fn query_rows(&self, sql: &str) -> Result<(Vec<Map<String, Value>>, bool), rusqlite::Error> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        let mut truncated = false;
        while let Some(row) = rows.next()? {
            if out.len() == MAX_ROWS {
                truncated = true;
                break;
            }
            let mut record = Map::with_capacity(columns.len());
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), json_value(row.get_ref(idx)?));
            }
            out.push(record);
        }
        Ok((out, truncated))
    }
}

/// Converts a column value to JSON.
fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}

impl SqlBackend for SqliteBackend {
    fn engine(&self) -> SqlEngine {
        SqlEngine::Sqlite
    }

    fn schema(&self) -> Result<String, BackendError> {
        let conn = self.connect()?;
        let to_err = |e: rusqlite::Error| BackendError::Connection {
            source_name: self.source_name.clone(),
            message: format!("schema introspection failed: {e}"),
        };

        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(to_err)?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(to_err)?
            .collect::<Result<_, _>>()
            .map_err(to_err)?;

        let mut schema = String::new();
        for table in &tables {
            let quoted = table.replace('"', "\"\"");
            let columns: Vec<String> = conn
                .prepare(&format!("PRAGMA table_info(\"{quoted}\")"))
                .and_then(|mut s| {
                    s.query_map([], |row| {
                        let name: String = row.get(1)?;
                        let ty: String = row.get(2)?;
                        Ok(format!("{name} {ty}"))
                    })?
                    .collect()
                })
                .map_err(to_err)?;
            let foreign_keys: Vec<String> = conn
                .prepare(&format!("PRAGMA foreign_key_list(\"{quoted}\")"))
                .and_then(|mut s| {
                    s.query_map([], |row| {
                        let target: String = row.get(2)?;
                        let from: String = row.get(3)?;
                        let to: String = row.get(4)?;
                        Ok(format!("{from}→{target}.{to}"))
                    })?
                    .collect()
                })
                .map_err(to_err)?;

            let _ = write!(schema, "Table {table}({}", columns.join(", "));
            if !foreign_keys.is_empty() {
                let _ = write!(schema, "; FK: {}", foreign_keys.join(", "));
            }
            schema.push_str(")\n");
        }

        Ok(schema.trim_end().to_string())
    }

    fn execute(&self, query: &str) -> String {
        match self.query_rows(query) {
            Ok((rows, _)) if rows.is_empty() => {
                "Query executed successfully, no rows returned.".to_string()
            }
            Ok((rows, truncated)) => {
                let mut text = serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string());
                if truncated {
                    let _ = write!(text, "\n(first {MAX_ROWS} rows shown)");
                }
                text
            }
            Err(e) => format!("Error executing query: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, SqliteBackend) {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("sales.db");
        let conn = Connection::open(&path).unwrap_or_else(|_| unreachable!());
        conn.execute_batch(
            "CREATE TABLE product (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE sales (
                 id INTEGER PRIMARY KEY,
                 product INTEGER NOT NULL REFERENCES product(id),
                 amount REAL NOT NULL
             );
             INSERT INTO product (id, name) VALUES (1, 'Product A'), (2, 'Product B');
             INSERT INTO sales (product, amount) VALUES (1, 1000.0), (1, 250.0), (2, 40.0);",
        )
        .unwrap_or_else(|_| unreachable!());
        drop(conn);
        let backend = SqliteBackend::open("sales_db", &path).unwrap_or_else(|_| unreachable!());
        (dir, backend)
    }

    #[test]
    fn test_execute_returns_json_rows() {
        let (_dir, backend) = fixture();
        let out = backend.execute(
            "SELECT p.name AS product, SUM(s.amount) AS total FROM sales s \
             JOIN product p ON p.id = s.product WHERE p.name = 'Product A' GROUP BY p.name",
        );
        let rows: Vec<Map<String, Value>> =
            serde_json::from_str(&out).unwrap_or_else(|_| unreachable!());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["product"], "Product A");
        assert_eq!(rows[0]["total"], 1250.0);
    }

    #[test]
    fn test_execute_empty_and_error() {
        let (_dir, backend) = fixture();
        let empty = backend.execute("SELECT * FROM sales WHERE amount > 1e9");
        assert!(crate::core::has_error(&empty));
        let failed = backend.execute("SELECT * FROM missing_table");
        assert!(failed.starts_with("Error executing query"));
    }

    #[test]
    fn test_connection_is_read_only() {
        let (_dir, backend) = fixture();
        let out = backend.execute("INSERT INTO product (id, name) VALUES (3, 'C')");
        assert!(out.starts_with("Error executing query"));
    }

    #[test]
    fn test_schema_introspection() {
        let (_dir, backend) = fixture();
        let schema = backend.schema().unwrap_or_else(|_| unreachable!());
        assert!(schema.contains("Table product(id INTEGER, name TEXT)"));
        assert!(schema.contains("FK: product→product.id"));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let result = SqliteBackend::open("ghost", &dir.path().join("nope.db"));
        assert!(matches!(result, Err(BackendError::Connection { .. })));
    }
}
