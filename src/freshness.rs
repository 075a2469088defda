//! Content-digest marker that lets an unchanged CSV skip reimport.
//!
//! The marker is a sidecar file next to the store holding the SHA-256 hex
//! digest of the CSV bytes last imported successfully. It is removed before
//! a reimport starts, so an interrupted import is never mistaken for fresh.

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::config::Settings;

/// Lowercase hex SHA-256 of the file content.
pub fn digest_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone)]
pub struct FreshnessMarker {
    path: PathBuf,
}

impl FreshnessMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_settings(settings: &Settings) -> Self {
        Self::new(settings.marker_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored digest, or `None` when no marker exists.
    pub fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let digest = contents.trim();
                Ok((!digest.is_empty()).then(|| digest.to_string()))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn write(&self, digest: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, digest)?;
        debug!("Wrote freshness marker {:?}", self.path);
        Ok(())
    }

    /// Removes the marker; a missing marker is not an error.
    pub fn clear(&self) -> io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Cleared freshness marker {:?}", self.path);
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn is_fresh(&self, digest: &str) -> io::Result<bool> {
        Ok(self.read()?.as_deref() == Some(digest))
    }
}
