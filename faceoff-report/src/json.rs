//! JSON Output
//!
//! One object keyed by heading, each value an array of per-version records.
//! Non-ASCII text is written literally.

use crate::tree::ResultSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where results are written when no path is configured
pub const DEFAULT_OUTPUT_PATH: &str = "output/benchmark-results/benchmark.json";

/// Errors while producing report output
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Generate the pretty-printed JSON document (2-space indent).
///
/// An empty result set yields exactly `{}`.
pub fn generate_json_report(results: &ResultSet) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(results)
}

/// Write the JSON document to `path`, creating parent directories.
pub fn write_json_report(results: &ResultSet, path: impl AsRef<Path>) -> Result<(), ReportError> {
    let path = path.as_ref();
    let json = generate_json_report(results)?;

    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, json).map_err(io_err)
}
