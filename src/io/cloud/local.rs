//! Filesystem-backed object storage and an object-store-backed catalog.
//!
//! [`LocalObjectIO`] maps bucket `b` and key `k` to `<root>/b/k`. Keys always use
//! `/` separators regardless of platform.
//!
//! [`ObjectCatalog`] keeps one JSON descriptor per table at
//! `_catalog/<database>/<table>.json` inside a bucket of any [`ObjectIO`].

use crate::io::cloud::helpers::validate_key_path;
use crate::io::cloud::traits::{
    CatalogIO, CloudIOError, CloudResult, ErrorKind, ObjectIO, ObjectMetadata, TableEntry,
};
use crate::io::glob::files_under;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ============================================================================
// LocalObjectIO
// ============================================================================

#[derive(Debug, Clone)]
pub struct LocalObjectIO {
    root: PathBuf,
}

impl LocalObjectIO {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    fn object_path(&self, bucket: &str, key: &str) -> CloudResult<PathBuf> {
        validate_key_path(key)?;
        let mut path = self.bucket_dir(bucket);
        path.extend(key.split('/'));
        Ok(path)
    }

    fn key_of(bucket_dir: &Path, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(bucket_dir).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

impl ObjectIO for LocalObjectIO {
    fn scheme(&self) -> &str {
        "file"
    }

    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CloudIOError::from(e).with_source(format!("mkdir -p {}", parent.display()))
            })?;
        }
        fs::write(&path, data)
            .map_err(|e| CloudIOError::from(e).with_source(format!("write {}", path.display())))
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).map_err(|e| {
            let err = CloudIOError::from(e);
            if err.is_not_found() {
                CloudIOError::new(ErrorKind::NotFound, format!("Object {bucket}/{key} not found"))
            } else {
                err.with_source(format!("read {}", path.display()))
            }
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CloudIOError::from(e).with_source(format!("remove {}", path.display()))),
        }
    }

    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>> {
        let bucket_dir = self.bucket_dir(bucket);
        let mut objects = Vec::new();
        for path in files_under(&bucket_dir)? {
            let Some(key) = Self::key_of(&bucket_dir, &path) else {
                continue;
            };
            if prefix.is_some_and(|p| !key.starts_with(p)) {
                continue;
            }
            objects.push(ObjectMetadata { key });
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool> {
        Ok(self.object_path(bucket, key)?.is_file())
    }

    fn object_uri(&self, bucket: &str, key: &str) -> String {
        let base = self.bucket_dir(bucket);
        format!("file://{}/{key}", base.display())
    }
}

// ============================================================================
// ObjectCatalog
// ============================================================================

/// Catalog persisted as JSON objects in a bucket.
#[derive(Clone)]
pub struct ObjectCatalog {
    store: Arc<dyn ObjectIO>,
    bucket: String,
}

impl ObjectCatalog {
    pub const PREFIX: &'static str = "_catalog/";

    pub fn new(store: Arc<dyn ObjectIO>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    #[must_use]
    pub fn entry_key(database: &str, table: &str) -> String {
        format!("{}{database}/{table}.json", Self::PREFIX)
    }
}

impl CatalogIO for ObjectCatalog {
    fn register_table(&self, entry: TableEntry) -> CloudResult<()> {
        let key = Self::entry_key(&entry.database, &entry.table);
        let body = serde_json::to_vec_pretty(&entry).map_err(|e| {
            CloudIOError::new(ErrorKind::InternalError, "serialize table entry")
                .with_source(e.to_string())
        })?;
        self.store.put_object(&self.bucket, &key, &body)
    }

    fn get_table(&self, database: &str, table: &str) -> CloudResult<TableEntry> {
        let key = Self::entry_key(database, table);
        let body = self.store.get_object(&self.bucket, &key).map_err(|e| {
            if e.is_not_found() {
                CloudIOError::new(
                    ErrorKind::NotFound,
                    format!("Table {database}.{table} not found"),
                )
            } else {
                e
            }
        })?;
        serde_json::from_slice(&body).map_err(|e| {
            CloudIOError::new(ErrorKind::InternalError, format!("corrupt catalog entry {key}"))
                .with_source(e.to_string())
        })
    }
}
