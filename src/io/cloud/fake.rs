//! Fake implementations for testing.
//!
//! These implementations use in-memory data structures to simulate object storage
//! and a table catalog, making them ideal for unit testing without external
//! dependencies.

use crate::io::cloud::traits::{
    CatalogIO, CloudIOError, CloudResult, ErrorKind, ObjectIO, ObjectMetadata, TableEntry,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

type BucketStorage = Arc<Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>>;

// ============================================================================
// FakeObjectIO
// ============================================================================

/// In-memory object store. Clones share the same storage.
#[derive(Clone, Default)]
pub struct FakeObjectIO {
    storage: BucketStorage,
    failing_puts: Arc<Mutex<Vec<String>>>,
}

impl FakeObjectIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `put_object` whose key starts with `prefix` fail.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn fail_puts_under(&self, prefix: &str) {
        self.failing_puts
            .lock()
            .expect("failing_puts mutex poisoned")
            .push(prefix.to_string());
    }

    /// All keys in a bucket, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the storage mutex is poisoned.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ObjectIO for FakeObjectIO {
    fn scheme(&self) -> &str {
        "mem"
    }

    fn put_object(&self, bucket: &str, key: &str, data: &[u8]) -> CloudResult<()> {
        let failing = self.failing_puts.lock().expect("failing_puts mutex poisoned");
        if failing.iter().any(|p| key.starts_with(p.as_str())) {
            return Err(CloudIOError::new(
                ErrorKind::Io,
                format!("injected put failure for {bucket}/{key}"),
            ));
        }
        drop(failing);
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(bucket)
            .and_then(|b| b.get(key))
            .cloned()
            .ok_or_else(|| {
                CloudIOError::new(
                    ErrorKind::NotFound,
                    format!("Object {bucket}/{key} not found"),
                )
            })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> CloudResult<()> {
        if let Some(bucket_map) = self
            .storage
            .lock()
            .expect("storage mutex poisoned")
            .get_mut(bucket)
        {
            bucket_map.remove(key);
        }
        Ok(())
    }

    fn list_objects(&self, bucket: &str, prefix: Option<&str>) -> CloudResult<Vec<ObjectMetadata>> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        let Some(bucket_map) = storage.get(bucket) else {
            return Ok(Vec::new());
        };

        let objects = bucket_map
            .keys()
            .filter(|key| prefix.is_none_or(|p| key.starts_with(p)))
            .map(|key| ObjectMetadata { key: key.clone() })
            .collect();
        Ok(objects)
    }

    fn object_exists(&self, bucket: &str, key: &str) -> CloudResult<bool> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        Ok(storage.get(bucket).is_some_and(|b| b.contains_key(key)))
    }
}

// ============================================================================
// FakeCatalogIO
// ============================================================================

/// In-memory catalog keyed by `<database>.<table>`.
#[derive(Clone, Default)]
pub struct FakeCatalogIO {
    tables: Arc<Mutex<HashMap<String, TableEntry>>>,
}

impl FakeCatalogIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered qualified names, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the tables mutex is poisoned.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .lock()
            .expect("tables mutex poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl CatalogIO for FakeCatalogIO {
    fn register_table(&self, entry: TableEntry) -> CloudResult<()> {
        self.tables
            .lock()
            .expect("tables mutex poisoned")
            .insert(entry.qualified_name(), entry);
        Ok(())
    }

    fn get_table(&self, database: &str, table: &str) -> CloudResult<TableEntry> {
        self.tables
            .lock()
            .expect("tables mutex poisoned")
            .get(&format!("{database}.{table}"))
            .cloned()
            .ok_or_else(|| {
                CloudIOError::new(
                    ErrorKind::NotFound,
                    format!("Table {database}.{table} not found"),
                )
            })
    }
}
