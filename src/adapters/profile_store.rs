//! Profile folder loader.
//!
//! Profiles are JSON files (`*.cfg`) in a folder, one selectable
//! [`Configuration`] per file:
//!
//! ```json
//! {
//!   "name": "Standard wash",
//!   "datasets": [
//!     { "name": "fan", "time": [0, 60, 120], "value": [0, 1, 0],
//!       "min": 0, "max": 1, "lineColor": "blue", "pointColor": "red" }
//!   ]
//! }
//! ```
//!
//! A file that fails to parse or violates a dataset invariant is skipped
//! with a warning; the rest of the folder still loads. A dataset whose
//! name maps to no actuator channel is skipped the same way.

use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::model::{Channel, Configuration, DataModel, Dataset, DatasetError};

// ---------------------------------------------------------------------------
// File schema
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ProfileFile {
    name: String,
    datasets: Vec<DatasetFile>,
}

#[derive(Debug, Deserialize)]
struct DatasetFile {
    name: String,
    time: Vec<f64>,
    value: Vec<f64>,
    min: f64,
    max: f64,
    #[serde(default, rename = "lineColor")]
    line_color: Option<String>,
    #[serde(default, rename = "pointColor")]
    point_color: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ProfileError {
    Io(io::Error),
    Parse(serde_json::Error),
    Dataset { name: String, cause: DatasetError },
    /// Every dataset in the file was rejected or unmapped.
    NoUsableDatasets,
}

impl core::fmt::Display for ProfileError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Parse(e) => write!(f, "parse error: {}", e),
            Self::Dataset { name, cause } => write!(f, "dataset '{}': {}", name, cause),
            Self::NoUsableDatasets => write!(f, "no usable datasets"),
        }
    }
}

impl std::error::Error for ProfileError {}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse and validate one profile file.
pub fn load_profile_file(path: &Path) -> Result<Configuration, ProfileError> {
    let text = fs::read_to_string(path).map_err(ProfileError::Io)?;
    let raw: ProfileFile = serde_json::from_str(&text).map_err(ProfileError::Parse)?;

    let source_id = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let mut config = Configuration::new(raw.name, source_id);

    for ds in raw.datasets {
        let Some(channel) = Channel::from_name(&ds.name) else {
            log::warn!("{}: dataset '{}' maps to no channel, skipped", path.display(), ds.name);
            continue;
        };
        let mut dataset = Dataset::new(ds.name.clone(), ds.time, ds.value, ds.min, ds.max)
            .map_err(|cause| ProfileError::Dataset { name: ds.name, cause })?;
        if let Some(c) = ds.line_color {
            dataset.line_color = c;
        }
        if let Some(c) = ds.point_color {
            dataset.point_color = c;
        }
        config.insert_dataset(channel, dataset);
    }

    if config.datasets().next().is_none() {
        return Err(ProfileError::NoUsableDatasets);
    }
    Ok(config)
}

/// Scan a folder for `*.cfg` files and load every valid profile into the
/// model. Returns how many loaded.
pub fn load_profile_dir(model: &mut DataModel, dir: &Path) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("profile folder {} unreadable: {}", dir.display(), e);
            return 0;
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "cfg"))
        .collect();
    paths.sort();

    let mut loaded = 0;
    for path in paths {
        log::info!("loading {}...", path.display());
        match load_profile_file(&path) {
            Ok(config) => {
                model.push_configuration(config);
                loaded += 1;
            }
            Err(e) => log::warn!("{} skipped: {}", path.display(), e),
        }
    }
    loaded
}
