#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the data directory.
//!
//! All paths are relative to the project root's `data/` directory unless
//! overridden with the `RISK_MAP_DATA_DIR` environment variable.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`.
///
/// # Panics
///
/// Panics if the project root cannot be resolved.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .expect("Failed to find project root from CARGO_MANIFEST_DIR")
        .to_path_buf()
}

/// Returns the data directory: `RISK_MAP_DATA_DIR` if set, otherwise
/// `data/` under the project root.
#[must_use]
pub fn data_dir() -> PathBuf {
    std::env::var("RISK_MAP_DATA_DIR")
        .map_or_else(|_| project_root().join("data"), PathBuf::from)
}

/// Returns the path of the risk-map `DuckDB` file under a data directory.
#[must_use]
pub fn risk_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("risk_map.duckdb")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
