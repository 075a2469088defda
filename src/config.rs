//! Runtime settings.
//!
//! Settings come from an optional YAML file and are then overridden by CLI
//! arguments. Every field has a default so an empty file (or no file) is a
//! valid configuration.

use std::{
    collections::HashSet,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CSV_PATH: &str = "./static/data.csv";
pub const DEFAULT_STORE_PATH: &str = "./static/summary.db";
pub const DEFAULT_TABLE_NAME: &str = "ModelEvaluation";
pub const DEFAULT_SAMPLE_ROWS: usize = 10;
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Number of leading identifier columns that carry a grouping role
/// (dataset, version, metric).
pub const ROLE_COLUMNS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub csv_path: PathBuf,
    pub store_path: PathBuf,
    pub table_name: String,
    pub sample_rows: usize,
    pub identifier_columns: Vec<String>,
    pub key_column: String,
    pub preserve_script: bool,
    pub clear_marker_on_exit: bool,
    pub bind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_encoding: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            sample_rows: DEFAULT_SAMPLE_ROWS,
            identifier_columns: ["dataset", "version", "metric", "parameter", "mode"]
                .into_iter()
                .map(String::from)
                .collect(),
            key_column: "id".to_string(),
            preserve_script: false,
            clear_marker_on_exit: true,
            bind: DEFAULT_BIND.to_string(),
            input_encoding: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let settings: Settings =
            serde_yaml::from_reader(reader).context("Parsing config YAML")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing config to YAML string")
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.table_name.trim().is_empty(),
            "Table name must not be empty"
        );
        ensure!(
            self.identifier_columns.len() >= ROLE_COLUMNS,
            "At least {ROLE_COLUMNS} identifier columns (dataset, version, metric) are required, found {}",
            self.identifier_columns.len()
        );
        ensure!(
            !self.key_column.trim().is_empty(),
            "Key column name must not be empty"
        );
        let mut seen = HashSet::new();
        seen.insert(self.key_column.to_ascii_lowercase());
        for name in &self.identifier_columns {
            ensure!(!name.trim().is_empty(), "Identifier column names must not be empty");
            ensure!(
                seen.insert(name.to_ascii_lowercase()),
                "Identifier column '{name}' is declared more than once"
            );
        }
        Ok(())
    }

    pub fn dataset_column(&self) -> &str {
        &self.identifier_columns[0]
    }

    pub fn version_column(&self) -> &str {
        &self.identifier_columns[1]
    }

    pub fn metric_column(&self) -> &str {
        &self.identifier_columns[2]
    }

    /// Sidecar file holding the last imported content digest.
    pub fn marker_path(&self) -> PathBuf {
        let mut raw = self.store_path.clone().into_os_string();
        raw.push(".hash");
        PathBuf::from(raw)
    }
}
