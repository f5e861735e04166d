//! Core traits for object storage and table catalogs.
//!
//! These traits are synchronous; implementations backed by async SDKs are
//! expected to block internally.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

// ============================================================================
// Core Error Type
// ============================================================================

/// Generic error type for storage and catalog operations
#[derive(Debug, Clone)]
pub struct CloudIOError {
    pub message: String,
    pub kind: ErrorKind,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidInput,
    Io,
    InternalError,
    Other,
}

impl fmt::Display for CloudIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl Error for CloudIOError {}

impl CloudIOError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl From<std::io::Error> for CloudIOError {
    fn from(e: std::io::Error) -> Self {
        let kind = match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            std::io::ErrorKind::InvalidInput => ErrorKind::InvalidInput,
            _ => ErrorKind::Io,
        };
        Self::new(kind, e.to_string())
    }
}

pub type CloudResult<T> = Result<T, CloudIOError>;

// ============================================================================
// ObjectIO - Object Storage
// ============================================================================

/// An object returned by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
}

/// Trait for object storage operations
pub trait ObjectIO: Send + Sync {
    /// URI scheme used when reporting object locations (e.g. `s3`, `file`)
    fn scheme(&self) -> &str;

    /// Upload data to object storage, replacing any existing object
    ///
    /// # Errors
    ///
    /// Returns an error if permissions are not enough or the upload fails
    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()>;

    /// Download data from object storage
    ///
    /// # Errors
    ///
    /// Returns an error if the object doesn't exist, permissions are not enough, or the download fails
    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>>;

    /// Delete an object; deleting a missing object is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if permissions are not enough or the deletion fails
    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()>;

    /// List objects with a prefix, sorted by key
    ///
    /// # Errors
    ///
    /// Returns an error if permissions are not enough or the listing fails
    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>>;

    /// Check if an object exists
    ///
    /// # Errors
    ///
    /// Returns an error if permissions are not enough or the check fails
    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool>;

    /// Fully qualified location of an object, e.g. `s3://bucket/raw/2024-01-01/a.csv`
    fn object_uri(&self, bucket: &str, key: &str) -> String {
        format!("{}://{bucket}/{key}", self.scheme())
    }

    /// Delete every object under `prefix`, returning how many were removed
    ///
    /// # Errors
    ///
    /// Returns the first listing or deletion error
    fn delete_prefix(&self, bucket: &str, prefix: &str) -> CloudResult<usize> {
        let objects = self.list_objects(bucket, Some(prefix))?;
        for obj in &objects {
            self.delete_object(bucket, &obj.key)?;
        }
        Ok(objects.len())
    }
}

// ============================================================================
// CatalogIO - Table Registration
// ============================================================================

/// A table registered in a catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub database: String,
    pub table: String,
    pub location: String,
    pub format: String,
    pub columns: Vec<(String, String)>,
}

impl TableEntry {
    /// `<database>.<table>`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

/// Trait for making written data queryable under a name
pub trait CatalogIO: Send + Sync {
    /// Create or replace the table entry
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be updated
    fn register_table(&self, entry: TableEntry) -> CloudResult<()>;

    /// Look up a table entry
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the table is not registered, or an error if the catalog is unreadable
    fn get_table(&self, database: &str, table: &str) -> CloudResult<TableEntry>;

    /// Check if a table is registered
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is unreadable
    fn table_exists(&self, database: &str, table: &str) -> CloudResult<bool> {
        match self.get_table(database, table) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
