//! Canonical file paths for a persisted store.
//!
//! A store is a CSV table plus a `<stem>.meta.json` sidecar in the same
//! directory.

use std::path::{Path, PathBuf};

/// File name of the statistics table inside a data directory.
pub const STATS_FILE_NAME: &str = "rolling_stats.csv";

/// Returns the statistics table path inside `data_dir`.
#[must_use]
pub fn stats_path(data_dir: &Path) -> PathBuf {
    data_dir.join(STATS_FILE_NAME)
}

/// Returns the metadata sidecar path for a statistics table.
#[must_use]
pub fn metadata_path(stats_path: &Path) -> PathBuf {
    let stem = stats_path
        .file_stem()
        .map_or_else(|| "rolling_stats".into(), |s| s.to_string_lossy());
    stats_path.with_file_name(format!("{stem}.meta.json"))
}

/// Creates the parent directory of `path` if it does not exist.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
