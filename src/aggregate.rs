//! Grouped per-metric averages over the loaded table.
//!
//! Rows are partitioned by *family key* (the dataset value up to its first
//! `_` or `-`) and by metric. Within a partition rows are ordered by dataset,
//! version and metric; the first row carries the family label and the
//! partition averages, every later row gets a blank label and `NULL`
//! averages. The other identifier columns pass through untouched, so the
//! output has exactly one row per stored row.
//!
//! Averages read every cell through [`metric_number`]: stored numbers and
//! text that parses losslessly as a number both count, whatever the column's
//! inferred type, and anything else is skipped.
//!
//! The grouping runs inside SQLite with window functions; the family key and
//! the metric reader are registered as deterministic scalar functions so the
//! Rust and SQL sides share one definition.

use log::{debug, warn};
use rusqlite::{Connection, functions::FunctionFlags, types::ValueRef};
use serde::Serialize;

use crate::{
    config::Settings,
    data::{CellValue, parse_metric_number},
    error::{EvalError, EvalResult},
    identifier::quote_identifier,
    store::Store,
};

const FAMILY_KEY_FN: &str = "family_key";
const METRIC_NUMBER_FN: &str = "metric_number";

/// Dataset family: everything before the earliest `_` or `-`, or the whole
/// value when neither occurs.
pub fn family_key(dataset: &str) -> &str {
    match dataset.find(['_', '-']) {
        Some(idx) => &dataset[..idx],
        None => dataset,
    }
}

/// Numeric reading of a stored metric cell, `None` when it has none.
pub fn metric_number(value: ValueRef<'_>) -> Option<f64> {
    let literal = match value {
        ValueRef::Null => return None,
        ValueRef::Integer(i) => return Some(i as f64),
        ValueRef::Real(f) => return Some(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => std::str::from_utf8(bytes).ok()?,
    };
    match parse_metric_number(literal)? {
        CellValue::Integer(i) => Some(i as f64),
        CellValue::Real(f) => Some(f),
        CellValue::Null | CellValue::Text(_) => None,
    }
}

pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    conn.create_scalar_function(FAMILY_KEY_FN, 1, flags, |ctx| {
        let dataset: Option<String> = ctx.get(0)?;
        Ok(dataset.map(|value| family_key(&value).to_string()))
    })?;
    conn.create_scalar_function(METRIC_NUMBER_FN, 1, flags, |ctx| {
        Ok(metric_number(ctx.get_raw(0)))
    })
}

/// Aggregated view of the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    /// Identifier column names followed by metric column names.
    pub headers: Vec<String>,
    /// Number of leading identifier columns in every row.
    pub identifier_count: usize,
    pub rows: Vec<Vec<CellValue>>,
}

impl Summary {
    pub fn metric_headers(&self) -> &[String] {
        &self.headers[self.identifier_count..]
    }

    /// Rows that open a partition (non-empty label).
    pub fn group_starts(&self) -> impl Iterator<Item = &Vec<CellValue>> {
        self.rows.iter().filter(|row| is_group_start(row))
    }
}

pub fn is_group_start(row: &[CellValue]) -> bool {
    matches!(row.first(), Some(CellValue::Text(label)) if !label.is_empty())
}

/// Names of the metric columns: every stored column that is neither the key
/// nor part of the identifier prefix.
fn metric_columns(store: &Store, settings: &Settings) -> EvalResult<Vec<String>> {
    let table = &settings.table_name;
    if !store.table_exists(table)? {
        return Err(EvalError::Aggregation(format!("table '{table}' does not exist")));
    }
    let columns = store.table_columns(table)?;
    let has = |name: &str| columns.iter().any(|c| c.eq_ignore_ascii_case(name));
    let missing = settings
        .identifier_columns
        .iter()
        .filter(|name| !has(name))
        .cloned()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(EvalError::Aggregation(format!(
            "table '{table}' lacks identifier column(s): {}",
            missing.join(", ")
        )));
    }
    Ok(columns
        .into_iter()
        .filter(|c| {
            !c.eq_ignore_ascii_case(&settings.key_column)
                && !settings
                    .identifier_columns
                    .iter()
                    .any(|id| id.eq_ignore_ascii_case(c))
        })
        .collect())
}

pub fn summary_sql(settings: &Settings, metrics: &[String]) -> String {
    let table = quote_identifier(&settings.table_name);
    let dataset = quote_identifier(settings.dataset_column());
    let version = quote_identifier(settings.version_column());
    let metric = quote_identifier(settings.metric_column());
    let key = quote_identifier(&settings.key_column);
    let partition = format!("PARTITION BY __family, {metric}");

    let averages = metrics
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let column = quote_identifier(name);
            format!(
                ",\n        AVG({METRIC_NUMBER_FN}({column})) OVER ({partition}) AS __avg_{idx}"
            )
        })
        .collect::<String>();

    let mut projection = vec![format!(
        "CASE WHEN __rank = 1 THEN __family ELSE '' END AS {dataset}"
    )];
    projection.extend(
        settings
            .identifier_columns
            .iter()
            .skip(1)
            .map(|name| quote_identifier(name)),
    );
    projection.extend(metrics.iter().enumerate().map(|(idx, name)| {
        format!(
            "CASE WHEN __rank = 1 THEN __avg_{idx} END AS {}",
            quote_identifier(name)
        )
    }));

    format!(
        "WITH keyed AS (\n    SELECT *, {FAMILY_KEY_FN}({dataset}) AS __family FROM {table}\n), \
         ranked AS (\n    SELECT *,\n        ROW_NUMBER() OVER ({partition} ORDER BY {dataset}, {version}, {metric}, {key}) AS __rank{averages}\n    FROM keyed\n)\n\
         SELECT {}\nFROM ranked\nORDER BY __family, {metric}, __rank",
        projection.join(", ")
    )
}

/// Runs the grouped-average query against the configured table.
pub fn aggregate(store: &Store, settings: &Settings) -> EvalResult<Summary> {
    let metrics = metric_columns(store, settings)?;
    register_functions(store.connection())?;
    let sql = summary_sql(settings, &metrics);
    debug!("Summary query:\n{sql}");
    let result = store.query(&sql, []).map_err(|err| {
        warn!("Summary query failed: {err}");
        EvalError::Aggregation(err.to_string())
    })?;

    let mut headers = settings.identifier_columns.clone();
    headers.extend(metrics);
    Ok(Summary {
        headers,
        identifier_count: settings.identifier_columns.len(),
        rows: result.rows,
    })
}
