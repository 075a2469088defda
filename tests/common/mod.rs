#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_evalboard::config::Settings;
use tempfile::{TempDir, tempdir};

pub const EVAL_HEADER: &str = "dataset,version,metric,parameter,mode";

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Copies a fixture from `tests/data` into the workspace.
    pub fn copy_fixture(&self, name: &str) -> PathBuf {
        let target = self.temp_dir.path().join(name);
        std::fs::copy(fixture_path(name), &target).expect("copy fixture");
        target
    }

    pub fn csv_path(&self) -> PathBuf {
        self.path().join("data.csv")
    }

    pub fn store_path(&self) -> PathBuf {
        self.path().join("summary.db")
    }

    /// Default settings pointed at `data.csv` and `summary.db` inside the
    /// workspace.
    pub fn settings(&self) -> Settings {
        Settings {
            csv_path: self.csv_path(),
            store_path: self.store_path(),
            ..Settings::default()
        }
    }
}
