//! Discovery of the dated batch to process.
//!
//! Raw input is laid out as `<input_folder><date>/<table>/<file>.csv`. Date
//! folder names are compared as strings, so they must sort chronologically; ISO
//! `YYYY-MM-DD` names do. A chosen name that is not an ISO date is still used,
//! with a warning.

use crate::error::{StageError, StageResult};
use crate::io::cloud::ObjectIO;
use crate::io::cloud::helpers::first_segment_after;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Extension of files eligible for processing.
pub const SOURCE_EXTENSION: &str = ".csv";

/// A raw file selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub key: String,
    /// First path segment below the date folder, if the file sits in one.
    pub table: Option<String>,
}

/// Lists date folders and source files in one bucket.
#[derive(Clone)]
pub struct BatchLocator {
    store: Arc<dyn ObjectIO>,
    bucket: String,
}

impl BatchLocator {
    pub fn new(store: Arc<dyn ObjectIO>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Folder names directly below `root`, sorted ascending.
    ///
    /// # Errors
    /// Returns [`StageError::Storage`] if listing fails.
    pub fn list_batch_dates(&self, root: &str) -> StageResult<BTreeSet<String>> {
        let objects = self.store.list_objects(&self.bucket, Some(root))?;
        Ok(objects
            .iter()
            .filter_map(|o| first_segment_after(&o.key, root))
            .map(str::to_string)
            .collect())
    }

    /// Pick the lexicographically greatest date folder under `root`.
    ///
    /// # Errors
    /// Returns [`StageError::NoData`] if there are no date folders.
    pub fn latest_batch_date(&self, root: &str) -> StageResult<String> {
        let dates = self.list_batch_dates(root)?;
        let latest = select_latest(&dates).ok_or_else(|| StageError::NoData {
            location: self.store.object_uri(&self.bucket, root),
        })?;
        if NaiveDate::parse_from_str(latest, "%Y-%m-%d").is_err() {
            warn!(folder = latest, "latest batch folder is not an ISO date; ordering is lexicographic");
        }
        info!(date = latest, candidates = dates.len(), "selected latest batch");
        Ok(latest.to_string())
    }

    /// Every `.csv` object below `date_prefix`, sorted by key.
    ///
    /// # Errors
    /// Returns [`StageError::Storage`] if listing fails.
    pub fn list_source_files(&self, date_prefix: &str) -> StageResult<Vec<SourceFile>> {
        let objects = self.store.list_objects(&self.bucket, Some(date_prefix))?;
        let mut files: Vec<SourceFile> = objects
            .into_iter()
            .filter(|o| o.key.ends_with(SOURCE_EXTENSION))
            .map(|o| SourceFile {
                table: table_name(&o.key, date_prefix).map(str::to_string),
                key: o.key,
            })
            .collect();
        files.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(files)
    }
}

/// The greatest name in the set.
#[must_use]
pub fn select_latest(dates: &BTreeSet<String>) -> Option<&str> {
    dates.last().map(String::as_str)
}

/// Table a source key belongs to: the folder directly below the date prefix.
///
/// ```
/// use rawstage::locator::table_name;
/// assert_eq!(table_name("raw/2024-01-01/orders/part-1.csv", "raw/2024-01-01/"), Some("orders"));
/// assert_eq!(table_name("raw/2024-01-01/loose.csv", "raw/2024-01-01/"), None);
/// ```
#[must_use]
pub fn table_name<'a>(key: &'a str, date_prefix: &str) -> Option<&'a str> {
    first_segment_after(key, date_prefix)
}
