//! # rawstage
//!
//! A **raw-to-staging cleaning job**: it picks the latest dated batch of CSV files
//! from a landing bucket, normalizes each file against its table's declared
//! schema, and writes typed Parquet partitions that are registered as queryable
//! tables.
//!
//! ## Flow
//!
//! ```text
//! raw/<date>/<table>/*.csv ──► locator ──► driver ──► schema ──► clean ──► parquet
//!                                              │                             │
//!                                              └──── catalog ◄── staging/<day>/<table>/
//! ```
//!
//! 1. [`locator`] lists date folders under the input prefix and picks the
//!    lexicographically greatest one.
//! 2. [`schema`] resolves `<schema_folder><table>.json` into a
//!    [`SchemaDescriptor`].
//! 3. [`clean`] runs the fixed normalization pipeline on the raw
//!    [`RecordSet`].
//! 4. [`driver`] stamps provenance columns, writes the partition, registers the
//!    table, and keeps going when a single file fails.
//!
//! ## Quick Start
//!
//! ```
//! use rawstage::clean::clean;
//! use rawstage::record::LogicalType;
//! use rawstage::schema::{FieldDeclaration, SchemaDescriptor};
//! use rawstage::testing::{column_strings, raw_records};
//!
//! let schema = SchemaDescriptor::new(vec![
//!     FieldDeclaration::new("qty", LogicalType::Int),
//! ]).unwrap();
//! let raw = raw_records(
//!     &[" Qty ", "Mobile-Phone"],
//!     &[&[Some(" 3 "), Some("555-0100")], &[None, Some("555-0199")]],
//! );
//!
//! let cleaned = clean(raw, &schema).unwrap();
//! assert_eq!(cleaned.column_names(), vec!["qty", "mobile_phone"]);
//! assert_eq!(column_strings(&cleaned, "qty"), vec![Some("3".into()), None]);
//! assert_eq!(
//!     column_strings(&cleaned, "mobile_phone"),
//!     vec![Some("5550100".into()), Some("5550199".into())]
//! );
//! ```
//!
//! ## Module Overview
//!
//! - [`record`] - Columnar record sets and typed values
//! - [`schema`] - Schema declarations and resolvers
//! - [`clean`] - The normalization pipeline
//! - [`locator`] - Batch and source file discovery
//! - [`driver`] - Per-batch orchestration and the batch summary
//! - [`job`] - Job lifecycle and exit status
//! - [`io`] - Object storage, catalog, CSV and Parquet I/O
//! - [`config`] - Layered job configuration
//! - [`logging`] - Tracing subscriber setup
//! - [`testing`] - Fixtures for tests

pub mod clean;
pub mod config;
pub mod driver;
pub mod error;
pub mod io;
pub mod job;
pub mod locator;
pub mod logging;
pub mod record;
pub mod schema;
pub mod testing;

pub use clean::{Stage, clean};
pub use config::JobConfig;
pub use driver::{Batch, BatchDriver, BatchSummary, FileOutcome, TableWrite};
pub use error::{StageError, StageResult};
pub use job::{JobRun, JobStatus};
pub use locator::{BatchLocator, SourceFile};
pub use record::{Column, LogicalType, RecordSet, Value};
pub use schema::{FieldDeclaration, ObjectSchemaResolver, SchemaDescriptor, SchemaResolver};
