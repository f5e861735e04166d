//! File globbing for the local object store.
//!
//! Directory trees are enumerated with a `**/*` pattern rooted at an escaped
//! base directory, so bucket roots containing glob metacharacters are matched
//! literally.

use crate::io::cloud::{CloudIOError, CloudResult, ErrorKind};
use glob::{Pattern, glob};
use std::path::{Path, PathBuf};

/// Expand a glob pattern into a sorted vector of matching file paths.
///
/// Directories are skipped. Zero matches is an empty vector, not an error.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or a matched entry can't be read.
pub fn expand_glob(pattern: &str) -> CloudResult<Vec<PathBuf>> {
    let paths = glob(pattern).map_err(|e| {
        CloudIOError::new(ErrorKind::InvalidInput, format!("invalid glob pattern: {pattern}"))
            .with_source(e.to_string())
    })?;

    let mut result = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| {
            CloudIOError::new(
                ErrorKind::Io,
                format!("error reading glob entry for pattern: {pattern}"),
            )
            .with_source(e.to_string())
        })?;
        if path.is_file() {
            result.push(path);
        }
    }

    // Sort for deterministic order
    result.sort();

    Ok(result)
}

/// Every file below `dir`, recursively, sorted. A missing directory yields
/// nothing.
///
/// # Errors
///
/// See [`expand_glob`].
pub fn files_under(dir: &Path) -> CloudResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let base = Pattern::escape(&dir.to_string_lossy());
    expand_glob(&format!("{base}/**/*"))
}
