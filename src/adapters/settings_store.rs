//! File-backed operator settings store.
//!
//! Settings are serialized with postcard into a small binary blob and
//! written atomically (temp file + rename), so a power cut mid-save
//! leaves the previous blob intact.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::config::OperatorSettings;
use crate::ports::{SettingsStore, StoreError};

/// Persists [`OperatorSettings`] to a single file.
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<OperatorSettings, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(StoreError::Io(e)),
        };
        postcard::from_bytes(&bytes).map_err(|_| StoreError::Corrupted)
    }

    fn save(&self, settings: &OperatorSettings) -> Result<(), StoreError> {
        let bytes = postcard::to_allocvec(settings).map_err(|_| StoreError::Corrupted)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes).map_err(StoreError::Io)?;
        fs::rename(&tmp, &self.path).map_err(StoreError::Io)?;
        Ok(())
    }
}
