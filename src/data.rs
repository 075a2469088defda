use std::fmt;

use log::debug;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use serde::Serialize;

use crate::infer::{ColumnType, analyze_numeric};

/// One stored cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Literal form of the cell; `NULL` renders as an empty string.
    pub fn as_display(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Real(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }

    pub fn from_sql_ref(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(f) => CellValue::Real(f),
            ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
            ValueRef::Blob(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_display())
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.to_stored(ColumnType::Text))
    }
}

impl CellValue {
    /// Binding for a cell stored in a column of `column_type`.
    ///
    /// Columns other than TEXT carry NUMERIC affinity, which would turn a
    /// numeric-looking literal kept as text (an out-of-range exponent, an
    /// integer wider than `i64`) back into a lossy number. Those literals are
    /// bound as blobs so the stored bytes stay exactly as read.
    pub fn to_stored(&self, column_type: ColumnType) -> ToSqlOutput<'_> {
        match self {
            CellValue::Text(s)
                if column_type != ColumnType::Text && analyze_numeric(s).is_some() =>
            {
                ToSqlOutput::Borrowed(ValueRef::Blob(s.as_bytes()))
            }
            CellValue::Null => ToSqlOutput::Owned(SqlValue::Null),
            CellValue::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            CellValue::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        }
    }
}

/// Lossless numeric reading of a literal.
///
/// `None` for anything that is not a number, for literals whose magnitude
/// falls outside the `f64` range and for integers too wide for `i64`.
pub fn parse_metric_number(raw: &str) -> Option<CellValue> {
    let trimmed = raw.trim();
    let literal = analyze_numeric(trimmed)?;
    if literal.unsafe_magnitude {
        return None;
    }
    if !literal.has_decimal_point && !literal.has_exponent {
        return trimmed.parse::<i64>().ok().map(CellValue::Integer);
    }
    Some(CellValue::Real(literal.value))
}

/// Converts a raw metric field into the value that gets stored.
///
/// Blank fields become `NULL`, every lossless number is stored as a number
/// whatever the column's inferred type, and everything else keeps its
/// original text.
pub fn coerce_metric(raw: &str) -> CellValue {
    if raw.trim().is_empty() {
        return CellValue::Null;
    }
    parse_metric_number(raw).unwrap_or_else(|| {
        debug!("Keeping metric value '{raw}' as text");
        CellValue::Text(raw.to_string())
    })
}
