//! Table schema model and the schema builder.
//!
//! A [`TableSchema`] is derived fresh from a CSV header plus a bounded sample
//! of data rows on every import:
//!
//! - a surrogate auto-increment key column,
//! - a fixed prefix of identifier columns (names come from [`Settings`],
//!   values are stored verbatim as non-null text),
//! - one nullable metric column per remaining CSV column, named with
//!   [`normalize_identifier()`] and typed with [`TypeTally`].
//!
//! Every statement that touches the table is rendered here so identifier
//! quoting happens in exactly one place.

use std::path::Path;

use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::{
    config::Settings,
    error::{EvalError, EvalResult},
    identifier::{NameRegistry, normalize_identifier, quote_identifier},
    infer::{ColumnType, TypeTally},
    io_utils,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Identifier,
    Metric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub original_name: String,
    pub normalized_name: String,
    pub inferred_type: ColumnType,
    /// Zero-based position of the source column in the CSV file.
    pub position: usize,
    pub role: ColumnRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub table_name: String,
    pub key_column: String,
    pub identifiers: Vec<ColumnSpec>,
    pub metrics: Vec<ColumnSpec>,
}

impl TableSchema {
    /// Builds a schema from a header row and sampled data rows.
    pub fn from_samples(
        settings: &Settings,
        headers: &[String],
        samples: &[Vec<String>],
    ) -> EvalResult<Self> {
        let prefix = settings.identifier_columns.len();
        if headers.len() < prefix {
            return Err(EvalError::TooFewColumns {
                expected: prefix,
                found: headers.len(),
            });
        }

        let mut registry = NameRegistry::new();
        registry.reserve(&settings.key_column);

        let identifiers = settings
            .identifier_columns
            .iter()
            .zip(headers)
            .enumerate()
            .map(|(position, (name, header))| {
                registry.reserve(name);
                ColumnSpec {
                    original_name: header.clone(),
                    normalized_name: name.clone(),
                    inferred_type: ColumnType::Text,
                    position,
                    role: ColumnRole::Identifier,
                }
            })
            .collect::<Vec<_>>();

        let metrics = headers
            .iter()
            .enumerate()
            .skip(prefix)
            .map(|(position, header)| {
                let mut tally = TypeTally::new();
                for row in samples {
                    if let Some(value) = row.get(position) {
                        tally.update(value);
                    }
                }
                let candidate = normalize_identifier(header, settings.preserve_script);
                let normalized_name = registry.claim(&candidate, position + 1);
                if normalized_name != candidate {
                    debug!(
                        "Column '{header}' at position {} renamed to '{normalized_name}'",
                        position + 1
                    );
                }
                ColumnSpec {
                    original_name: header.clone(),
                    normalized_name,
                    inferred_type: tally.decide(),
                    position,
                    role: ColumnRole::Metric,
                }
            })
            .collect();

        Ok(TableSchema {
            table_name: settings.table_name.clone(),
            key_column: settings.key_column.clone(),
            identifiers,
            metrics,
        })
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.identifiers.iter().chain(self.metrics.iter())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns().map(|c| c.normalized_name.as_str()).collect()
    }

    pub fn quoted_table(&self) -> String {
        quote_identifier(&self.table_name)
    }

    pub fn create_table_sql(&self) -> String {
        let mut definitions = vec![format!(
            "    {} INTEGER PRIMARY KEY AUTOINCREMENT",
            quote_identifier(&self.key_column)
        )];
        for column in &self.identifiers {
            definitions.push(format!(
                "    {} TEXT NOT NULL",
                quote_identifier(&column.normalized_name)
            ));
        }
        for column in &self.metrics {
            definitions.push(format!(
                "    {} {}",
                quote_identifier(&column.normalized_name),
                column.inferred_type.sql_type()
            ));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
            self.quoted_table(),
            definitions.join(",\n")
        )
    }

    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {};", self.quoted_table())
    }

    pub fn insert_sql(&self) -> String {
        let count = self.identifiers.len() + self.metrics.len();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quoted_table(),
            self.columns()
                .map(|c| quote_identifier(&c.normalized_name))
                .join(", "),
            (1..=count).map(|idx| format!("?{idx}")).join(", ")
        )
    }

    /// Rows for the column listing printed by `schema`.
    pub fn describe_rows(&self) -> Vec<Vec<String>> {
        self.columns()
            .map(|column| {
                vec![
                    (column.position + 1).to_string(),
                    column.original_name.clone(),
                    column.normalized_name.clone(),
                    column.inferred_type.to_string(),
                    match column.role {
                        ColumnRole::Identifier => "identifier".to_string(),
                        ColumnRole::Metric => "metric".to_string(),
                    },
                ]
            })
            .collect()
    }
}

/// Reads the header and the first `settings.sample_rows` data rows of `path`
/// (every row when the sample size is zero) and builds the schema.
pub fn build_schema(path: &Path, settings: &Settings) -> EvalResult<TableSchema> {
    if !path.exists() {
        return Err(EvalError::MissingInput(path.to_path_buf()));
    }
    let encoding = io_utils::resolve_encoding(settings.input_encoding.as_deref())
        .map_err(|err| EvalError::Config(err.to_string()))?;
    let mut reader = io_utils::open_csv_reader_from_path(path, true)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)?;
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(EvalError::EmptyHeader(path.to_path_buf()));
    }

    let mut samples = Vec::new();
    let mut record = csv::ByteRecord::new();
    while settings.sample_rows == 0 || samples.len() < settings.sample_rows {
        if !reader.read_byte_record(&mut record)? {
            break;
        }
        samples.push(io_utils::decode_record(&record, encoding));
    }
    debug!(
        "Sampled {} row(s) from {:?} for type inference",
        samples.len(),
        path
    );

    TableSchema::from_samples(settings, &headers, &samples)
}
