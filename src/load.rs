//! CSV row loading.
//!
//! Streams every data row of the source file into the table described by a
//! [`TableSchema`], inside a single transaction. Identifier fields are stored
//! verbatim, and so are metric fields of TEXT columns. Other metric fields go
//! through [`coerce_metric()`]; a field that cannot be coerced is stored as
//! its literal text and counted, it never aborts the load. A failure reported
//! by the store rolls the whole batch back.

use std::path::Path;

use encoding_rs::Encoding;
use log::{debug, info};
use rusqlite::{params_from_iter, types::ToSqlOutput};

use crate::{
    data::{CellValue, coerce_metric},
    error::{EvalError, EvalResult},
    identifier::quote_identifier,
    infer::ColumnType,
    io_utils,
    schema::TableSchema,
    store::Store,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    /// Row count reported by the store after the commit.
    pub rows_stored: i64,
    /// Metric cells kept as text inside numeric columns.
    pub text_fallbacks: usize,
}

/// Builds the stored values for one CSV record.
pub fn row_values(schema: &TableSchema, fields: &[String]) -> (Vec<CellValue>, usize) {
    let field = |position: usize| fields.get(position).map(String::as_str).unwrap_or("");
    let mut fallbacks = 0usize;
    let mut values = Vec::with_capacity(schema.identifiers.len() + schema.metrics.len());
    for column in &schema.identifiers {
        values.push(CellValue::Text(field(column.position).to_string()));
    }
    for column in &schema.metrics {
        let raw = field(column.position);
        let value = match column.inferred_type {
            ColumnType::Text if raw.trim().is_empty() => CellValue::Null,
            ColumnType::Text => CellValue::Text(raw.to_string()),
            _ => coerce_metric(raw),
        };
        if column.inferred_type.is_numeric() && matches!(value, CellValue::Text(_)) {
            fallbacks += 1;
        }
        values.push(value);
    }
    (values, fallbacks)
}

/// Insert parameters for one row, bound according to each column's type.
pub fn bind_row<'a>(schema: &TableSchema, values: &'a [CellValue]) -> Vec<ToSqlOutput<'a>> {
    schema
        .columns()
        .zip(values)
        .map(|(column, value)| value.to_stored(column.inferred_type))
        .collect()
}

/// Replaces the table content with the rows of `path`.
pub fn load_csv(
    store: &mut Store,
    path: &Path,
    schema: &TableSchema,
    encoding: &'static Encoding,
) -> EvalResult<LoadReport> {
    if !path.exists() {
        return Err(EvalError::MissingInput(path.to_path_buf()));
    }
    let mut reader = io_utils::open_csv_reader_from_path(path, true)?;
    reader.byte_headers()?;

    store.execute(&format!("DELETE FROM {}", quote_identifier(&schema.table_name)), [])?;

    let insert_sql = schema.insert_sql();
    let mut report = LoadReport::default();
    let tx = store.connection_mut().transaction()?;
    {
        let mut stmt = tx.prepare(&insert_sql)?;
        let mut record = csv::ByteRecord::new();
        while reader.read_byte_record(&mut record)? {
            let fields = io_utils::decode_record(&record, encoding);
            let (values, fallbacks) = row_values(schema, &fields);
            stmt.execute(params_from_iter(bind_row(schema, &values)))?;
            report.rows_read += 1;
            report.text_fallbacks += fallbacks;
        }
    }
    tx.commit()?;

    report.rows_stored = store.count_rows(&schema.table_name)?;
    if report.text_fallbacks > 0 {
        info!(
            "{} metric value(s) kept as text in numeric columns",
            report.text_fallbacks
        );
    }
    debug!(
        "Loaded {} row(s) from {:?}, store reports {}",
        report.rows_read, path, report.rows_stored
    );
    Ok(report)
}
