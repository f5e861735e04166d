//! Testing utilities for cleaning jobs.
//!
//! - [`raw_records`]: build a raw (all-string) record set from literal rows
//! - [`column_strings`]: read a column back as optional strings for assertions
//! - [`LandingZone`]: an in-memory bucket with raw files, schema declarations and
//!   a catalog, wired to a [`BatchDriver`]
//!
//! # Quick Start
//!
//! ```
//! use rawstage::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let zone = LandingZone::new();
//! zone.put_schema("orders", r#"[{"name": "qty", "type": "int"}]"#)?;
//! zone.put_csv("2024-03-01", "orders", "a.csv", "Qty\n1\n1\n")?;
//!
//! let summary = zone.driver().run_at(fixed_time("2024-03-02T08:00:00"))?;
//! assert!(!summary.is_degraded());
//!
//! let out = zone.read_output("2024-03-02", "orders")?;
//! assert_eq!(out.num_rows(), 1);
//! # Ok(())
//! # }
//! ```

use crate::config::JobConfig;
use crate::driver::{BatchDriver, OUTPUT_FILE_NAME};
use crate::io::cloud::{FakeCatalogIO, FakeObjectIO, ObjectIO};
use crate::io::parquet::read_parquet_bytes;
use crate::record::{RecordSet, Value};
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::sync::Arc;

pub const TEST_BUCKET: &str = "landing";
pub const TEST_DATABASE: &str = "staging_db";

/// Build a raw record set; `None` cells are nulls.
///
/// # Panics
///
/// Panics if a row's width differs from the header's.
#[must_use]
pub fn raw_records(headers: &[&str], rows: &[&[Option<&str>]]) -> RecordSet {
    let rows = rows
        .iter()
        .map(|r| r.iter().map(|v| Value::from(*v)).collect())
        .collect();
    RecordSet::from_rows(headers.iter().map(|h| (*h).to_string()).collect(), rows)
        .expect("rows must match header width")
}

/// The values of a column rendered as strings; nulls are `None`.
///
/// # Panics
///
/// Panics if the column does not exist.
#[must_use]
pub fn column_strings(records: &RecordSet, name: &str) -> Vec<Option<String>> {
    records
        .column(name)
        .unwrap_or_else(|| panic!("no column '{name}' in {:?}", records.column_names()))
        .values
        .iter()
        .map(|v| (!v.is_null()).then(|| v.to_string()))
        .collect()
}

/// Parse `YYYY-MM-DDTHH:MM:SS`.
///
/// # Panics
///
/// Panics on malformed input.
#[must_use]
pub fn fixed_time(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").expect("valid fixed time")
}

/// A job configuration pointing at [`TEST_BUCKET`] and [`TEST_DATABASE`].
#[must_use]
pub fn test_config() -> JobConfig {
    JobConfig {
        bucket: TEST_BUCKET.to_string(),
        database: TEST_DATABASE.to_string(),
        ..JobConfig::default()
    }
}

/// In-memory landing zone for end-to-end runs.
#[derive(Clone)]
pub struct LandingZone {
    pub store: FakeObjectIO,
    pub catalog: FakeCatalogIO,
    pub config: JobConfig,
}

impl Default for LandingZone {
    fn default() -> Self {
        Self::new()
    }
}

impl LandingZone {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: FakeObjectIO::new(),
            catalog: FakeCatalogIO::new(),
            config: test_config(),
        }
    }

    /// Store a raw file at `<input_folder><date>/<table>/<file>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn put_csv(&self, date: &str, table: &str, file: &str, body: &str) -> Result<String> {
        let key = format!("{}{date}/{table}/{file}", self.config.input_folder);
        self.put_raw(&key, body)?;
        Ok(key)
    }

    /// Store arbitrary bytes at `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn put_raw(&self, key: &str, body: &str) -> Result<()> {
        self.store
            .put_object(&self.config.bucket, key, body.as_bytes())
            .with_context(|| format!("put {key}"))
    }

    /// Store a schema declaration for `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn put_schema(&self, table: &str, json: &str) -> Result<()> {
        let key = format!("{}{table}.json", self.config.schema_folder);
        self.put_raw(&key, json)
    }

    /// A driver over this zone's store and catalog.
    #[must_use]
    pub fn driver(&self) -> BatchDriver {
        BatchDriver::new(
            self.config.clone(),
            Arc::new(self.store.clone()),
            Arc::new(self.catalog.clone()),
        )
    }

    /// Key of the output file for a partition.
    #[must_use]
    pub fn output_key(&self, date: &str, table: &str) -> String {
        format!("{}{date}/{table}/{OUTPUT_FILE_NAME}", self.config.output_folder)
    }

    /// Raw bytes of a written partition.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition was not written.
    pub fn output_bytes(&self, date: &str, table: &str) -> Result<Vec<u8>> {
        let key = self.output_key(date, table);
        self.store
            .get_object(&self.config.bucket, &key)
            .with_context(|| format!("get {key}"))
    }

    /// Decode a written partition.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition was not written or can't be decoded.
    pub fn read_output(&self, date: &str, table: &str) -> Result<RecordSet> {
        read_parquet_bytes(self.output_bytes(date, table)?)
    }
}
