//! Parquet encoding of record sets, powered by Arrow.
//!
//! - [`write_parquet_bytes`] turns a typed [`RecordSet`] into an in-memory Parquet
//!   file (one row group, Snappy compressed)
//! - [`read_parquet_bytes`] decodes such a file back into a record set
//! - [`arrow_schema`] exposes the column type mapping
//!
//! Type mapping (all fields nullable):
//!
//! | logical type          | Arrow type |
//! |-----------------------|------------|
//! | `string`, `timestamp` | `Utf8`     |
//! | `int`                 | `Int32`    |
//! | `long`                | `Int64`    |
//! | `double`              | `Float64`  |
//! | `date`                | `Date32`   |
//!
//! Timestamp columns are already rendered to text by the cleaning stages, so they
//! are stored as strings.

use crate::record::{Column, LogicalType, RecordSet, Value};
use anyhow::{Context, Result, anyhow, bail};
use arrow::array::{
    Array, ArrayRef, AsArray, Date32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Date32Type, Field, Float64Type, Int32Type, Int64Type, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use bytes::Bytes;
use chrono::{Duration, NaiveDate};
use ordered_float::OrderedFloat;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::sync::Arc;

fn unix_epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Arrow type used to store a column of the given logical type.
#[must_use]
pub fn arrow_type(kind: LogicalType) -> DataType {
    match kind {
        LogicalType::String | LogicalType::Timestamp => DataType::Utf8,
        LogicalType::Int => DataType::Int32,
        LogicalType::Long => DataType::Int64,
        LogicalType::Double => DataType::Float64,
        LogicalType::Date => DataType::Date32,
    }
}

/// Arrow schema for a record set, in column order.
#[must_use]
pub fn arrow_schema(records: &RecordSet) -> Schema {
    Schema::new(
        records
            .columns()
            .iter()
            .map(|c| Field::new(c.name.as_str(), arrow_type(c.kind), true))
            .collect::<Vec<_>>(),
    )
}

fn mismatch(column: &Column, v: &Value) -> anyhow::Error {
    anyhow!(
        "column '{}' is declared {} but holds {v:?}",
        column.name,
        column.kind
    )
}

fn column_to_array(column: &Column) -> Result<ArrayRef> {
    let array: ArrayRef = match column.kind {
        LogicalType::String | LogicalType::Timestamp => {
            let vals = column
                .values
                .iter()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Str(s) => Ok(Some(s.as_str())),
                    other => Err(mismatch(column, other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(StringArray::from(vals))
        }
        LogicalType::Int => {
            let vals = column
                .values
                .iter()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Int(i) => Ok(Some(*i)),
                    other => Err(mismatch(column, other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(Int32Array::from(vals))
        }
        LogicalType::Long => {
            let vals = column
                .values
                .iter()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Long(i) => Ok(Some(*i)),
                    other => Err(mismatch(column, other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(Int64Array::from(vals))
        }
        LogicalType::Double => {
            let vals = column
                .values
                .iter()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Double(d) => Ok(Some(d.into_inner())),
                    other => Err(mismatch(column, other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(Float64Array::from(vals))
        }
        LogicalType::Date => {
            let vals = column
                .values
                .iter()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    Value::Date(d) => {
                        let days = d.signed_duration_since(unix_epoch()).num_days();
                        i32::try_from(days)
                            .map(Some)
                            .with_context(|| format!("date {d} out of Date32 range"))
                    }
                    other => Err(mismatch(column, other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(Date32Array::from(vals))
        }
    };
    Ok(array)
}

/// Encode a record set as a Parquet file held in memory.
///
/// A zero-row record set produces a valid file with the full schema.
///
/// # Errors
/// Returns an error if a value does not match its column's declared type or the
/// Arrow writer fails.
pub fn write_parquet_bytes(records: &RecordSet) -> Result<Vec<u8>> {
    let schema = Arc::new(arrow_schema(records));
    let arrays = records
        .columns()
        .iter()
        .map(column_to_array)
        .collect::<Result<Vec<_>>>()?;
    let options = RecordBatchOptions::new().with_row_count(Some(records.num_rows()));
    let batch = RecordBatch::try_new_with_options(Arc::clone(&schema), arrays, &options)
        .context("assemble RecordBatch")?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer =
        ArrowWriter::try_new(Vec::new(), schema, Some(props)).context("create ArrowWriter")?;
    writer.write(&batch).context("write batch to parquet")?;
    writer.into_inner().context("close ArrowWriter")
}

fn logical_type_of(data_type: &DataType) -> Result<LogicalType> {
    Ok(match data_type {
        DataType::Utf8 => LogicalType::String,
        DataType::Int32 => LogicalType::Int,
        DataType::Int64 => LogicalType::Long,
        DataType::Float64 => LogicalType::Double,
        DataType::Date32 => LogicalType::Date,
        other => bail!("unsupported Arrow type {other}"),
    })
}

fn append_array(column: &mut Column, array: &dyn Array) -> Result<()> {
    let values = &mut column.values;
    match column.kind {
        LogicalType::String | LogicalType::Timestamp => {
            let a = array.as_string::<i32>();
            values.extend((0..a.len()).map(|i| {
                if a.is_null(i) {
                    Value::Null
                } else {
                    Value::str(a.value(i))
                }
            }));
        }
        LogicalType::Int => {
            let a = array.as_primitive::<Int32Type>();
            values.extend(a.iter().map(|v| v.map_or(Value::Null, Value::Int)));
        }
        LogicalType::Long => {
            let a = array.as_primitive::<Int64Type>();
            values.extend(a.iter().map(|v| v.map_or(Value::Null, Value::Long)));
        }
        LogicalType::Double => {
            let a = array.as_primitive::<Float64Type>();
            values.extend(
                a.iter()
                    .map(|v| v.map_or(Value::Null, |d| Value::Double(OrderedFloat(d)))),
            );
        }
        LogicalType::Date => {
            let a = array.as_primitive::<Date32Type>();
            for v in a.iter() {
                values.push(match v {
                    None => Value::Null,
                    Some(days) => Value::Date(
                        unix_epoch()
                            .checked_add_signed(Duration::days(i64::from(days)))
                            .context("Date32 value out of range")?,
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Decode a Parquet file produced by [`write_parquet_bytes`].
///
/// # Errors
/// Returns an error if the bytes are not a readable Parquet file or contain an
/// Arrow type outside the mapping above.
pub fn read_parquet_bytes(data: impl Into<Bytes>) -> Result<RecordSet> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data.into())
        .context("open ParquetRecordBatchReader")?;
    let mut columns = builder
        .schema()
        .fields()
        .iter()
        .map(|f| Ok(Column::new(f.name().as_str(), logical_type_of(f.data_type())?, Vec::new())))
        .collect::<Result<Vec<_>>>()?;
    let reader = builder.build().context("build ParquetRecordBatchReader")?;

    for batch in reader {
        let batch = batch.context("read next batch")?;
        for (column, array) in columns.iter_mut().zip(batch.columns()) {
            append_array(column, array.as_ref())?;
        }
    }
    RecordSet::from_columns(columns).context("assemble Parquet columns")
}
