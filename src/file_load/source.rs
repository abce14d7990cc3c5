use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::config::Source;
use crate::error::ImportError;
use crate::file_load::{download::download_file, validate_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Downloaded,
}

/// A file on local disk that is ready to be loaded, remembering whether this
/// run created it.
#[derive(Debug)]
pub struct AcquiredFile {
    path: PathBuf,
    origin: Origin,
}

impl AcquiredFile {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            origin: Origin::Local,
        }
    }

    pub fn downloaded(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            origin: Origin::Downloaded,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    // Remove the file if this run downloaded it; user files are never touched
    pub fn cleanup(self) {
        if self.origin != Origin::Downloaded || !self.path.exists() {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Cleaned up temporary file: {}", self.path.display()),
            Err(e) => warn!("Could not clean up temporary file: {}", e),
        }
    }
}

// Resolve the configured source to a local file
pub fn acquire(
    source: &Source,
    download_dir: &Path,
    verbose: bool,
) -> Result<AcquiredFile, ImportError> {
    match source {
        Source::File(path) => {
            validate_file(path)?;
            Ok(AcquiredFile::local(path))
        }
        Source::Url(url) => {
            let path = download_file(url, download_dir, verbose)?;
            Ok(AcquiredFile::downloaded(path))
        }
    }
}
