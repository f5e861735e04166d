//! Batch orchestration: locate, clean, stamp, write, register.
//!
//! A run picks the latest dated folder under the input prefix and processes each
//! `.csv` file in it independently. Failures are scoped to the file: they are
//! logged, recorded in the [`BatchSummary`], and the next file is attempted.
//!
//! Output for table `t` lands in
//! `<output_folder><YYYY-MM-DD>/t/part-00000.snappy.parquet`, where the date is the
//! date portion of the batch timestamp. Existing objects in that partition are
//! removed first, so re-running a day replaces it.

use crate::clean::clean;
use crate::config::JobConfig;
use crate::error::{StageError, StageResult};
use crate::io::cloud::{CatalogIO, ObjectIO, TableEntry};
use crate::io::csv::read_raw_csv;
use crate::io::parquet::{arrow_type, write_parquet_bytes};
use crate::locator::{BatchLocator, SourceFile};
use crate::schema::{ObjectSchemaResolver, SchemaResolver};
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tracing::{error, info, info_span};

pub const SOURCE_PATH_COLUMN: &str = "source_path";
pub const UPDATED_TIME_COLUMN: &str = "updated_time";
pub const OUTPUT_FILE_NAME: &str = "part-00000.snappy.parquet";

/// Format of the `updated_time` provenance value.
pub const BATCH_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One processing cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Chosen date folder name.
    pub date: String,
    /// `<input_folder><date>/`
    pub date_prefix: String,
    pub files: Vec<SourceFile>,
    /// Stamped into every row written by this run.
    pub timestamp: String,
}

impl Batch {
    /// The `YYYY-MM-DD` partition output is written under.
    #[must_use]
    pub fn partition_date(&self) -> &str {
        self.timestamp.get(..10).unwrap_or(&self.timestamp)
    }
}

#[must_use]
pub fn batch_timestamp(now: NaiveDateTime) -> String {
    now.format(BATCH_TIMESTAMP_FORMAT).to_string()
}

/// A successfully written table partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWrite {
    pub table: String,
    pub rows: usize,
    /// Object key of the written file.
    pub key: String,
    /// `<database>.<table>`
    pub qualified_name: String,
}

#[derive(Debug)]
pub struct FileOutcome {
    pub key: String,
    pub table: Option<String>,
    pub result: StageResult<TableWrite>,
}

/// Per-file results of one run.
#[derive(Debug)]
pub struct BatchSummary {
    pub date: String,
    pub timestamp: String,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchSummary {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// True when at least one file failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.failed() > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &StageError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.key.as_str(), e)))
    }

    pub fn writes(&self) -> impl Iterator<Item = &TableWrite> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

pub struct BatchDriver {
    config: JobConfig,
    store: Arc<dyn ObjectIO>,
    catalog: Arc<dyn CatalogIO>,
    resolver: Arc<dyn SchemaResolver>,
}

impl BatchDriver {
    /// A driver resolving schemas from `<schema_folder><table>.json` in the
    /// configured bucket.
    pub fn new(config: JobConfig, store: Arc<dyn ObjectIO>, catalog: Arc<dyn CatalogIO>) -> Self {
        let resolver = Arc::new(ObjectSchemaResolver::new(
            Arc::clone(&store),
            config.bucket.clone(),
            config.schema_folder.clone(),
        ));
        Self {
            config,
            store,
            catalog,
            resolver,
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn SchemaResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Choose the batch to process, stamping it with `now`.
    ///
    /// # Errors
    /// Returns [`StageError::NoData`] when no date folders exist, or
    /// [`StageError::Storage`] when listing fails.
    pub fn locate(&self, now: NaiveDateTime) -> StageResult<Batch> {
        let locator = BatchLocator::new(Arc::clone(&self.store), self.config.bucket.clone());
        let date = locator.latest_batch_date(&self.config.input_folder)?;
        let date_prefix = format!("{}{date}/", self.config.input_folder);
        let files = locator.list_source_files(&date_prefix)?;
        info!(
            count = files.len(),
            location = %self.store.object_uri(&self.config.bucket, &date_prefix),
            "found source files"
        );
        Ok(Batch {
            date,
            date_prefix,
            files,
            timestamp: batch_timestamp(now),
        })
    }

    /// Run against the latest batch using the current local time.
    ///
    /// # Errors
    /// See [`BatchDriver::locate`]; per-file errors are reported in the summary.
    pub fn run(&self) -> StageResult<BatchSummary> {
        self.run_at(Local::now().naive_local())
    }

    /// Run against the latest batch with a fixed timestamp.
    ///
    /// # Errors
    /// See [`BatchDriver::locate`].
    pub fn run_at(&self, now: NaiveDateTime) -> StageResult<BatchSummary> {
        let batch = self.locate(now)?;
        Ok(self.process_batch(&batch))
    }

    /// Attempt every file in the batch.
    #[must_use]
    pub fn process_batch(&self, batch: &Batch) -> BatchSummary {
        let outcomes = batch
            .files
            .iter()
            .map(|file| {
                let span = info_span!("file", key = %file.key);
                let _enter = span.enter();
                let result = self.process_file(batch, file);
                match &result {
                    Ok(write) => info!(
                        table = %write.table,
                        rows = write.rows,
                        output = %write.key,
                        "table cleaned and saved"
                    ),
                    Err(e) => error!(key = %file.key, error = %e, "failed to process file"),
                }
                FileOutcome {
                    key: file.key.clone(),
                    table: file.table.clone(),
                    result,
                }
            })
            .collect();
        BatchSummary {
            date: batch.date.clone(),
            timestamp: batch.timestamp.clone(),
            outcomes,
        }
    }

    /// `<output_folder><date>/<table>/`
    #[must_use]
    pub fn partition_prefix(&self, date: &str, table: &str) -> String {
        format!("{}{date}/{table}/", self.config.output_folder)
    }

    /// Clean one source file and persist it.
    ///
    /// # Errors
    /// Returns the [`StageError`] of the first step that failed.
    pub fn process_file(&self, batch: &Batch, file: &SourceFile) -> StageResult<TableWrite> {
        let bucket = self.config.bucket.as_str();
        let table = file.table.as_deref().ok_or_else(|| {
            StageError::transform(&file.key, "file is not inside a table folder")
        })?;
        info!(table, "processing");

        let schema = self.resolver.resolve(table)?;

        let bytes = self
            .store
            .get_object(bucket, &file.key)
            .map_err(|e| StageError::transform(&file.key, e))?;
        let raw = read_raw_csv(&bytes)
            .map_err(|e| StageError::transform(&file.key, format!("{e:#}")))?;
        let cleaned = clean(raw, &schema).map_err(|e| StageError::transform(&file.key, e))?;

        let source_path = self.store.object_uri(bucket, &file.key);
        let stamped = cleaned
            .with_literal(SOURCE_PATH_COLUMN, &source_path)
            .with_literal(UPDATED_TIME_COLUMN, &batch.timestamp);

        let prefix = self.partition_prefix(batch.partition_date(), table);
        let key = format!("{prefix}{OUTPUT_FILE_NAME}");
        let location = self.store.object_uri(bucket, &prefix);

        let body = write_parquet_bytes(&stamped)
            .map_err(|e| StageError::write(&location, format!("{e:#}")))?;
        self.store
            .delete_prefix(bucket, &prefix)
            .map_err(|e| StageError::write(&location, e))?;
        self.store
            .put_object(bucket, &key, &body)
            .map_err(|e| StageError::write(&location, e))?;

        let entry = TableEntry {
            database: self.config.database.clone(),
            table: table.to_string(),
            location: location.clone(),
            format: "parquet".to_string(),
            columns: stamped
                .columns()
                .iter()
                .map(|c| (c.name.clone(), arrow_type(c.kind).to_string()))
                .collect(),
        };
        let qualified_name = entry.qualified_name();
        self.catalog
            .register_table(entry)
            .map_err(|e| StageError::write(&location, e))?;

        Ok(TableWrite {
            table: table.to_string(),
            rows: stamped.num_rows(),
            key,
            qualified_name,
        })
    }
}
