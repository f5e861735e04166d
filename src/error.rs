//! Error taxonomy for a raw-to-staging run.
//!
//! Only [`StageError::NoData`], [`StageError::Storage`] and [`StageError::Config`]
//! abort a run. Every other variant is scoped to a single source file and is
//! recorded in the [`BatchSummary`](crate::driver::BatchSummary) by the driver.

use crate::io::cloud::CloudIOError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type StageResult<T> = Result<T, StageError>;

#[derive(Debug, Error)]
pub enum StageError {
    /// No dated partitions exist under the raw input root.
    #[error("no date folders found under {location}")]
    NoData { location: String },

    /// A table's schema declaration is missing, unreadable, or malformed.
    #[error("failed to load schema for table '{table}': {message}")]
    SchemaLoad { table: String, message: String },

    /// Reading or normalizing one source file failed.
    #[error("failed to transform {key}: {message}")]
    Transform { key: String, message: String },

    /// Persisting output or registering the table failed.
    #[error("failed to write {location}: {message}")]
    Write { location: String, message: String },

    /// Listing the object store failed while locating the batch.
    #[error("storage error: {0}")]
    Storage(#[from] CloudIOError),

    /// The job configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StageError {
    pub fn schema_load(table: impl Into<String>, message: impl ToString) -> Self {
        Self::SchemaLoad {
            table: table.into(),
            message: message.to_string(),
        }
    }

    pub fn transform(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Transform {
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn write(location: impl Into<String>, message: impl ToString) -> Self {
        Self::Write {
            location: location.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error aborts the whole run rather than a single file.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoData { .. } | Self::Storage(_) | Self::Config(_)
        )
    }
}
