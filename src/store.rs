//! Embedded SQLite store.
//!
//! Thin wrapper over a `rusqlite` connection exposing the handful of calls
//! the pipeline needs: statement and script execution, table replacement,
//! column introspection, row counts, and generic result-set queries.

use std::{fs, path::Path};

use log::debug;
use rusqlite::{Connection, OptionalExtension, Params, params};
use serde::Serialize;

use crate::{
    data::CellValue,
    error::EvalResult,
    identifier::quote_identifier,
    schema::TableSchema,
};

/// Column headers plus rows of a query result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> EvalResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!("Opened store {:?}", path);
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> EvalResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn execute<P: Params>(&self, sql: &str, params: P) -> EvalResult<usize> {
        Ok(self.conn.execute(sql, params)?)
    }

    pub fn execute_script(&self, sql: &str) -> EvalResult<()> {
        Ok(self.conn.execute_batch(sql)?)
    }

    /// Drops the table described by `schema` (if present) and creates it anew.
    pub fn recreate_table(&self, schema: &TableSchema) -> EvalResult<()> {
        let script = format!("{}\n{}", schema.drop_table_sql(), schema.create_table_sql());
        debug!("Recreating table:\n{script}");
        self.execute_script(&script)
    }

    pub fn table_exists(&self, table: &str) -> EvalResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn table_columns(&self, table: &str) -> EvalResult<Vec<String>> {
        let sql = format!("PRAGMA table_info({})", quote_identifier(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn count_rows(&self, table: &str) -> EvalResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    pub fn query<P: Params>(&self, sql: &str, params: P) -> EvalResult<ResultSet> {
        let mut stmt = self.conn.prepare(sql)?;
        let headers = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let width = headers.len();
        let rows = stmt
            .query_map(params, |row| {
                (0..width)
                    .map(|idx| row.get_ref(idx).map(CellValue::from_sql_ref))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResultSet { headers, rows })
    }

    /// Every stored row in insertion order.
    pub fn raw_table(&self, table: &str) -> EvalResult<ResultSet> {
        let sql = format!("SELECT * FROM {} ORDER BY rowid", quote_identifier(table));
        self.query(&sql, [])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn schema() -> TableSchema {
        let headers = ["a", "b", "c", "d", "e", "score"]
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        let samples = vec![
            ["x", "v", "m", "p", "o", "1"]
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>(),
        ];
        TableSchema::from_samples(&Settings::default(), &headers, &samples).expect("schema")
    }

    #[test]
    fn recreate_table_replaces_existing_content() {
        let store = Store::open_in_memory().expect("store");
        let schema = schema();
        store.recreate_table(&schema).expect("create");
        store
            .execute(
                &schema.insert_sql(),
                params!["x", "v", "m", "p", "o", 1i64],
            )
            .expect("insert");
        assert_eq!(store.count_rows("ModelEvaluation").unwrap(), 1);

        store.recreate_table(&schema).expect("recreate");
        assert_eq!(store.count_rows("ModelEvaluation").unwrap(), 0);
        assert_eq!(
            store.table_columns("ModelEvaluation").unwrap(),
            vec!["id", "dataset", "version", "metric", "parameter", "mode", "score"]
        );
    }

    #[test]
    fn table_exists_reports_missing_tables() {
        let store = Store::open_in_memory().expect("store");
        assert!(!store.table_exists("ModelEvaluation").unwrap());
        store.recreate_table(&schema()).expect("create");
        assert!(store.table_exists("ModelEvaluation").unwrap());
    }

    #[test]
    fn query_returns_typed_cells() {
        let store = Store::open_in_memory().expect("store");
        let result = store
            .query("SELECT 1 AS a, 2.5 AS b, 'x' AS c, NULL AS d", [])
            .expect("query");
        assert_eq!(result.headers, vec!["a", "b", "c", "d"]);
        assert_eq!(
            result.rows,
            vec![vec![
                CellValue::Integer(1),
                CellValue::Real(2.5),
                CellValue::Text("x".to_string()),
                CellValue::Null,
            ]]
        );
    }
}
