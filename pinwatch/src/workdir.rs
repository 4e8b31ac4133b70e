//! Shared working directory for diagnostic output
//!
//! Both the detail flusher and the memory snapshot scheduler write into one
//! directory, created lazily on first use and memoized for the lifetime of
//! the provider. Creation happens under a mutex, so concurrent first callers
//! observe a single directory.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::info;

use crate::domain::{file_timestamp_now, FatalError};

/// Directory name prefix; a timestamp and random suffix follow
pub const WORKDIR_PREFIX: &str = "pinwatch-";

#[derive(Debug)]
pub struct WorkingDirectoryProvider {
    base: PathBuf,
    path: Mutex<Option<PathBuf>>,
}

impl WorkingDirectoryProvider {
    /// Provider creating its directory under the system temp dir
    pub fn new() -> Self {
        Self::with_base(std::env::temp_dir())
    }

    /// Provider creating its directory under `base`
    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into(), path: Mutex::new(None) }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path of the working directory, creating it on the first call
    ///
    /// # Errors
    /// Returns [`FatalError::WorkDirCreation`] if the directory cannot be created
    pub fn get(&self) -> Result<PathBuf, FatalError> {
        let mut slot = self.path.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(path) = slot.as_ref() {
            return Ok(path.clone());
        }

        let prefix = format!("{WORKDIR_PREFIX}{}-", file_timestamp_now());
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .keep(true)
            .tempdir_in(&self.base)
            .map_err(|source| FatalError::WorkDirCreation { base: self.base.clone(), source })?;

        let path = dir.path().to_path_buf();
        info!("Created working directory: {}", path.display());
        *slot = Some(path.clone());
        Ok(path)
    }
}

impl Default for WorkingDirectoryProvider {
    fn default() -> Self {
        Self::new()
    }
}
