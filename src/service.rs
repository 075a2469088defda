//! Import and summary operations bound to one configured CSV/store pair.
//!
//! An [`EvalService`] is built once per process and shared by reference
//! with the CLI handlers and the web handlers. Imports go through a mutex so
//! two requests never drop and recreate the same table concurrently.

use std::{
    fmt,
    io,
    sync::{Mutex, PoisonError},
};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{info, warn};
use serde::Serialize;

use crate::{
    aggregate::{self, Summary},
    config::Settings,
    error::{EvalError, EvalResult},
    freshness::{FreshnessMarker, digest_file},
    io_utils,
    load::load_csv,
    present::{self, DisplayTable},
    schema::build_schema,
    store::Store,
};

/// Result of one import attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Updated { rows: i64 },
    Unchanged,
    MissingInput,
    Failed { reason: String },
}

impl ImportOutcome {
    /// Integer form: stored rows after an update, `-1` when the source was
    /// unchanged, `0` when nothing could be imported.
    pub fn count(&self) -> i64 {
        match self {
            ImportOutcome::Updated { rows } => *rows,
            ImportOutcome::Unchanged => -1,
            ImportOutcome::MissingInput | ImportOutcome::Failed { .. } => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ImportOutcome::MissingInput | ImportOutcome::Failed { .. }
        )
    }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportOutcome::Updated { rows } => write!(f, "imported {rows} rows"),
            ImportOutcome::Unchanged => f.write_str("no update"),
            ImportOutcome::MissingInput => f.write_str("CSV file not found"),
            ImportOutcome::Failed { reason } => write!(f, "import failed: {reason}"),
        }
    }
}

/// A display table plus an optional diagnostic shown above it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryView {
    pub table: DisplayTable,
    pub notice: Option<String>,
}

impl SummaryView {
    fn failed(notice: impl Into<String>) -> Self {
        Self {
            table: DisplayTable::default(),
            notice: Some(notice.into()),
        }
    }
}

pub struct EvalService {
    settings: Settings,
    encoding: &'static Encoding,
    marker: FreshnessMarker,
    import_lock: Mutex<()>,
}

impl EvalService {
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let encoding = io_utils::resolve_encoding(settings.input_encoding.as_deref())
            .context("Resolving input encoding")?;
        let marker = FreshnessMarker::for_settings(&settings);
        Ok(Self {
            settings,
            encoding,
            marker,
            import_lock: Mutex::new(()),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn marker(&self) -> &FreshnessMarker {
        &self.marker
    }

    /// Imports the CSV unless its digest matches the marker and the stored
    /// table is still present (or `force`). Failures, including a CSV without
    /// data rows, are reported through the outcome, never as a panic or error.
    pub fn import(&self, force: bool) -> ImportOutcome {
        let _guard = self
            .import_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match self.run_import(force) {
            Ok(outcome) => outcome,
            Err(EvalError::MissingInput(path)) => {
                warn!("CSV file {:?} not found; skipping import", path);
                ImportOutcome::MissingInput
            }
            Err(err) => {
                warn!("Import of {:?} failed: {err}", self.settings.csv_path);
                ImportOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn run_import(&self, force: bool) -> EvalResult<ImportOutcome> {
        let csv_path = &self.settings.csv_path;
        if !csv_path.exists() {
            return Err(EvalError::MissingInput(csv_path.clone()));
        }
        let digest = digest_file(csv_path)?;
        if !force && self.marker.is_fresh(&digest)? {
            if self.stored_table_present()? {
                info!("CSV {:?} unchanged; keeping stored table", csv_path);
                return Ok(ImportOutcome::Unchanged);
            }
            info!(
                "CSV {:?} unchanged but table '{}' is missing from {:?}",
                csv_path, self.settings.table_name, self.settings.store_path
            );
        }
        info!(
            "Importing {:?} into table '{}'{}",
            csv_path,
            self.settings.table_name,
            if force { " (forced)" } else { "" }
        );
        self.marker.clear()?;

        let schema = build_schema(csv_path, &self.settings)?;
        let mut store = Store::open(&self.settings.store_path)?;
        store.recreate_table(&schema)?;
        let report = load_csv(&mut store, csv_path, &schema, self.encoding)?;
        if report.rows_stored <= 0 {
            return Err(EvalError::NoDataRows(csv_path.clone()));
        }
        self.marker.write(&digest)?;

        info!(
            "Imported {} row(s) into '{}'",
            report.rows_stored, schema.table_name
        );
        Ok(ImportOutcome::Updated {
            rows: report.rows_stored,
        })
    }

    fn stored_table_present(&self) -> EvalResult<bool> {
        if !self.settings.store_path.exists() {
            return Ok(false);
        }
        Store::open(&self.settings.store_path)?.table_exists(&self.settings.table_name)
    }

    fn open_existing_store(&self) -> EvalResult<Store> {
        let path = &self.settings.store_path;
        if !path.exists() {
            return Err(EvalError::Aggregation(format!(
                "store {} does not exist; import a CSV first",
                path.display()
            )));
        }
        Store::open(path)
    }

    pub fn summary_data(&self) -> EvalResult<Summary> {
        let store = self.open_existing_store()?;
        aggregate::aggregate(&store, &self.settings)
    }

    /// Aggregated view; a failing query yields an empty table and a notice.
    pub fn summary(&self) -> SummaryView {
        match self.summary_data() {
            Ok(summary) => SummaryView {
                table: present::summary_table(&summary),
                notice: None,
            },
            Err(err) => {
                warn!("Summary unavailable: {err}");
                SummaryView::failed(err.to_string())
            }
        }
    }

    /// Every stored row, key column included, with metric formatting.
    pub fn raw_view(&self) -> SummaryView {
        let result = self
            .open_existing_store()
            .and_then(|store| store.raw_table(&self.settings.table_name));
        match result {
            Ok(rows) => SummaryView {
                table: present::raw_table(&rows, 1 + self.settings.identifier_columns.len()),
                notice: None,
            },
            Err(err) => {
                warn!("Raw table unavailable: {err}");
                SummaryView::failed(err.to_string())
            }
        }
    }

    /// Conditional (or forced) import followed by the aggregated view. An
    /// import that could not run is reported as the view's notice.
    pub fn import_and_summarize(&self, force: bool) -> (ImportOutcome, SummaryView) {
        let outcome = self.import(force);
        let mut view = self.summary();
        if outcome.is_failure() {
            view.notice = Some(match view.notice.take() {
                Some(existing) => format!("{outcome}; {existing}"),
                None => outcome.to_string(),
            });
        }
        (outcome, view)
    }

    pub fn clear_marker(&self) -> io::Result<bool> {
        self.marker.clear()
    }

    /// Applies the configured exit policy for the freshness marker.
    pub fn finish(&self) {
        if self.settings.clear_marker_on_exit
            && let Err(err) = self.clear_marker()
        {
            warn!(
                "Failed to clear freshness marker {:?}: {err}",
                self.marker.path()
            );
        }
    }
}
