//! Delimited text I/O for raw record sets.
//!
//! - [`read_raw_csv`] parses header-prefixed CSV bytes into a [`RecordSet`] of
//!   string columns
//! - [`write_raw_csv`] renders a record set back to CSV (used to stage fixtures)
//!
//! # Design notes
//! - The first record is always the header; labels are kept verbatim so the
//!   cleaning stages see exactly what the source declared.
//! - Empty fields are read as absent values ([`Value::Null`]), not empty strings.
//! - Parsing is permissive about ragged rows: short rows are padded with nulls and
//!   surplus trailing fields are dropped.

use crate::record::{RecordSet, Value};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};

/// Parse CSV bytes into a raw record set.
///
/// # Errors
/// Returns an error if the header is missing or a record is not valid UTF-8 CSV.
pub fn read_raw_csv(bytes: &[u8]) -> Result<RecordSet> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = rdr
        .headers()
        .context("read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();
    anyhow::ensure!(!headers.is_empty(), "CSV header row is empty");

    let width = headers.len();
    let mut rows = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("parse CSV record #{}", i + 1))?;
        let mut row: Vec<Value> = rec
            .iter()
            .take(width)
            .map(|f| if f.is_empty() { Value::Null } else { Value::str(f) })
            .collect();
        row.resize(width, Value::Null);
        rows.push(row);
    }

    RecordSet::from_rows(headers, rows).context("assemble CSV columns")
}

/// Render a record set as CSV with a header row. Nulls become empty fields.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn write_raw_csv(records: &RecordSet) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new().from_writer(Vec::new());
    wtr.write_record(records.column_names())
        .context("write CSV header")?;
    for i in 0..records.num_rows() {
        let fields: Vec<String> = records
            .row(i)
            .into_iter()
            .map(|v| if v.is_null() { String::new() } else { v.to_string() })
            .collect();
        wtr.write_record(&fields)
            .with_context(|| format!("write CSV row #{}", i + 1))?;
    }
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("flush CSV writer: {}", e.error()))
}
