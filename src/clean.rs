//! Schema-driven normalization of raw record sets.
//!
//! [`clean`] runs the fixed [`Stage::PIPELINE`]: each [`Stage`] consumes a
//! [`RecordSet`] and returns a new one, so every step can also be invoked (and
//! tested) on its own through [`Stage::apply`] or the stage functions below.
//!
//! | # | stage                         | effect                                              |
//! |---|-------------------------------|-----------------------------------------------------|
//! | 1 | [`canonicalize_columns`]      | lowercase labels, non-word runs to `_`              |
//! | 2 | [`trim_strings`]              | strip surrounding whitespace from string values     |
//! | 3 | [`normalize_phone_numbers`]   | drop `-` in `*phone*` / `*mobile*` columns          |
//! | 4 | [`split_multi_values`]        | split `"a or b"` values into parts                  |
//! | 5 | [`fill_nulls`]                | nulls become the [`NULL_SENTINEL`] text             |
//! | 6 | [`cast_to_schema`]            | coerce declared columns, render timestamps          |
//! | 7 | [`drop_duplicates`]           | collapse fully identical rows                       |
//!
//! Casting never fails on bad input: a value that cannot be coerced to its
//! declared type, including the sentinel itself, becomes a typed null.

use crate::record::{Column, LogicalType, RecordSet, ShapeError, Value};
use crate::schema::SchemaDescriptor;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ordered_float::OrderedFloat;
#[cfg(feature = "parallel-cast")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Text substituted for missing values before casting.
pub const NULL_SENTINEL: &str = "None";

/// Output pattern for declared timestamp columns. The hour is not zero-padded.
pub const TIMESTAMP_OUTPUT_FORMAT: &str = "%Y-%m-%dT%-H:%M:%S";

static NON_WORD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("valid non-word regex"));

static MULTI_VALUE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[oOóÓ][rR]\s+").expect("valid separator regex"));

const TIMESTAMP_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A stage produced a malformed record set.
#[derive(Debug, Clone, Error)]
#[error("stage '{stage}' failed: {source}")]
pub struct CleanError {
    pub stage: &'static str,
    #[source]
    pub source: ShapeError,
}

/// One step of the normalization pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CanonicalizeColumns,
    TrimStrings,
    NormalizePhoneNumbers,
    SplitMultiValues,
    FillNulls,
    CastToSchema,
    DropDuplicates,
}

impl Stage {
    /// The fixed execution order.
    pub const PIPELINE: [Self; 7] = [
        Self::CanonicalizeColumns,
        Self::TrimStrings,
        Self::NormalizePhoneNumbers,
        Self::SplitMultiValues,
        Self::FillNulls,
        Self::CastToSchema,
        Self::DropDuplicates,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CanonicalizeColumns => "canonicalize_columns",
            Self::TrimStrings => "trim_strings",
            Self::NormalizePhoneNumbers => "normalize_phone_numbers",
            Self::SplitMultiValues => "split_multi_values",
            Self::FillNulls => "fill_nulls",
            Self::CastToSchema => "cast_to_schema",
            Self::DropDuplicates => "drop_duplicates",
        }
    }

    /// Run this stage alone.
    ///
    /// # Errors
    /// Returns a [`CleanError`] if the stage would produce columns of unequal
    /// length.
    pub fn apply(self, records: RecordSet, schema: &SchemaDescriptor) -> Result<RecordSet, CleanError> {
        let out = match self {
            Self::CanonicalizeColumns => canonicalize_columns(records),
            Self::TrimStrings => trim_strings(records),
            Self::NormalizePhoneNumbers => normalize_phone_numbers(records),
            Self::SplitMultiValues => split_multi_values(records, schema).map_err(|source| {
                CleanError {
                    stage: self.name(),
                    source,
                }
            })?,
            Self::FillNulls => fill_nulls(records),
            Self::CastToSchema => cast_to_schema(records, schema),
            Self::DropDuplicates => drop_duplicates(records),
        };
        Ok(out)
    }
}

/// Run the full pipeline.
///
/// # Errors
/// Propagates the first [`CleanError`].
pub fn clean(raw: RecordSet, schema: &SchemaDescriptor) -> Result<RecordSet, CleanError> {
    Stage::PIPELINE.into_iter().try_fold(raw, |records, stage| {
        let out = stage.apply(records, schema)?;
        debug!(
            stage = stage.name(),
            columns = out.num_columns(),
            rows = out.num_rows(),
            "stage complete"
        );
        Ok(out)
    })
}

// ----------------------------------------------------------------------------
// 1. Column names
// ----------------------------------------------------------------------------

const fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Canonical form of a column label.
///
/// ```
/// use rawstage::clean::canonical_name;
/// assert_eq!(canonical_name(" Order ID! "), "order_id");
/// assert_eq!(canonical_name("Phone-Number"), "phone_number");
/// ```
#[must_use]
pub fn canonical_name(label: &str) -> String {
    let lowered = label.trim().to_lowercase();
    let inner = lowered.trim_matches(|c: char| !is_word_char(c));
    NON_WORD_RUN.replace_all(inner, "_").into_owned()
}

/// Rename every column positionally to its canonical name.
///
/// Names that collide with an earlier column get `_2`, `_3`, ... suffixes; a
/// label with no word characters at all becomes `column_<position>`.
#[must_use]
pub fn canonicalize_columns(records: RecordSet) -> RecordSet {
    let mut taken: HashSet<String> = HashSet::with_capacity(records.num_columns());
    let mut position = 0usize;
    records.map_columns(|col| {
        position += 1;
        let mut name = canonical_name(&col.name);
        if name.is_empty() {
            name = format!("column_{position}");
        }
        if taken.contains(&name) {
            let base = name;
            let mut n = 2usize;
            name = format!("{base}_{n}");
            while taken.contains(&name) {
                n += 1;
                name = format!("{base}_{n}");
            }
            warn!(original = %col.name, renamed = %name, "canonical column name collision");
        }
        taken.insert(name.clone());
        Column { name, ..col }
    })
}

// ----------------------------------------------------------------------------
// 2-3. String clean-up
// ----------------------------------------------------------------------------

/// Strip leading and trailing whitespace from every string value.
#[must_use]
pub fn trim_strings(records: RecordSet) -> RecordSet {
    records.map_columns(|col| {
        if col.is_string() {
            col.map_strings(|s| s.trim().to_string())
        } else {
            col
        }
    })
}

/// Whether a canonical column name denotes a phone number.
#[must_use]
pub fn is_phone_column(name: &str) -> bool {
    name.contains("phone") || name.contains("mobile")
}

/// Remove every `-` from string columns named like phone numbers.
#[must_use]
pub fn normalize_phone_numbers(records: RecordSet) -> RecordSet {
    records.map_columns(|col| {
        if col.is_string() && is_phone_column(&col.name) {
            col.map_strings(|s| s.replace('-', ""))
        } else {
            col
        }
    })
}

// ----------------------------------------------------------------------------
// 4. Multi-valued fields
// ----------------------------------------------------------------------------

/// Split a value on the first ` or ` separator into two trimmed parts.
///
/// A value without a separator yields `(value, None)`.
#[must_use]
pub fn split_once_on_or(value: &str) -> (String, Option<String>) {
    match MULTI_VALUE_SEPARATOR.find(value) {
        Some(m) => (
            value[..m.start()].trim().to_string(),
            Some(value[m.end()..].trim().to_string()),
        ),
        None => (value.trim().to_string(), None),
    }
}

fn has_multi_values(col: &Column) -> bool {
    col.values
        .iter()
        .filter_map(Value::as_str)
        .any(|s| MULTI_VALUE_SEPARATOR.is_match(s))
}

/// Split string columns holding `"a or b"` style values.
///
/// Only columns where at least one value contains the separator are touched.
/// A column the schema declares keeps its name and only the first part; any
/// other column is replaced by `<name>_part1` and `<name>_part2` appended at the
/// end (overwriting existing columns of those names).
///
/// # Errors
/// Returns a [`ShapeError`] only if the input record set is itself malformed.
pub fn split_multi_values(
    records: RecordSet,
    schema: &SchemaDescriptor,
) -> Result<RecordSet, ShapeError> {
    let candidates: Vec<String> = records
        .columns()
        .iter()
        .filter(|c| c.is_string() && has_multi_values(c))
        .map(|c| c.name.clone())
        .collect();

    let mut records = records;
    for name in candidates {
        // An earlier split may have replaced this column with a part.
        let Some(col) = records
            .column(&name)
            .filter(|c| c.is_string() && has_multi_values(c))
        else {
            continue;
        };
        let (first, second): (Vec<Value>, Vec<Value>) = col
            .values
            .iter()
            .map(|v| match v {
                Value::Str(s) => {
                    let (a, b) = split_once_on_or(s);
                    (Value::Str(a), b.map_or(Value::Null, Value::Str))
                }
                _ => (Value::Null, Value::Null),
            })
            .unzip();

        if schema.contains(&name) {
            debug!(column = %name, "multi-valued schema column, keeping first part");
            records = records.with_column(Column::new(name.as_str(), LogicalType::String, first))?;
        } else {
            debug!(column = %name, "multi-valued column split into parts");
            records = records
                .with_column(Column::new(format!("{name}_part1"), LogicalType::String, first))?
                .with_column(Column::new(format!("{name}_part2"), LogicalType::String, second))?
                .without_column(&name);
        }
    }
    Ok(records)
}

// ----------------------------------------------------------------------------
// 5. Nulls
// ----------------------------------------------------------------------------

/// Replace every null with [`NULL_SENTINEL`].
///
/// Before casting all columns are strings; typed columns (which cannot hold
/// text) keep their nulls.
#[must_use]
pub fn fill_nulls(records: RecordSet) -> RecordSet {
    records.map_columns(|col| {
        if !col.is_string() {
            return col;
        }
        let values = col
            .values
            .into_iter()
            .map(|v| if v.is_null() { Value::str(NULL_SENTINEL) } else { v })
            .collect();
        Column { values, ..col }
    })
}

// ----------------------------------------------------------------------------
// 6. Casting
// ----------------------------------------------------------------------------

fn parse_integral(s: &str) -> Option<i64> {
    let s = s.trim();
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = int_part.strip_prefix(['+', '-']).unwrap_or(int_part);
    if digits.is_empty() {
        // ".5" truncates to zero; a bare "." is not a number.
        return (!frac_part.is_empty()).then_some(0);
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    int_part.parse().ok()
}

/// Coerce text to a 32-bit integer; fractional parts are truncated.
#[must_use]
pub fn cast_int(s: &str) -> Option<i32> {
    parse_integral(s).and_then(|v| i32::try_from(v).ok())
}

/// Coerce text to a 64-bit integer; fractional parts are truncated.
#[must_use]
pub fn cast_long(s: &str) -> Option<i64> {
    parse_integral(s)
}

#[must_use]
pub fn cast_double(s: &str) -> Option<f64> {
    s.trim().parse().ok()
}

/// Coerce `YYYY-MM-DD`, optionally followed by a time part, to a date.
#[must_use]
pub fn cast_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let day = s.split(['T', ' ']).next().unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Parse a timestamp in one of the accepted textual forms.
///
/// Values carrying an explicit offset (RFC 3339) are converted to UTC; bare dates
/// are taken as midnight.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Render a timestamp value in [`TIMESTAMP_OUTPUT_FORMAT`].
///
/// ```
/// use rawstage::clean::format_timestamp;
/// assert_eq!(format_timestamp("2023-05-01 09:05:03").as_deref(), Some("2023-05-01T9:05:03"));
/// assert_eq!(format_timestamp("None"), None);
/// ```
#[must_use]
pub fn format_timestamp(s: &str) -> Option<String> {
    parse_timestamp(s).map(|ts| ts.format(TIMESTAMP_OUTPUT_FORMAT).to_string())
}

fn convert_values<F>(values: Vec<Value>, f: F) -> Vec<Value>
where
    F: Fn(&str) -> Value + Send + Sync,
{
    let apply = |v: Value| match v {
        Value::Str(s) => f(&s),
        _ => Value::Null,
    };
    #[cfg(feature = "parallel-cast")]
    {
        values.into_par_iter().map(apply).collect()
    }
    #[cfg(not(feature = "parallel-cast"))]
    {
        values.into_iter().map(apply).collect()
    }
}

fn cast_column(col: Column, target: LogicalType) -> Column {
    // Only raw (string) columns are coerced; a column already typed is left as is.
    if !col.is_string() {
        return col;
    }
    let (kind, values) = match target {
        LogicalType::String => return col,
        LogicalType::Timestamp => (
            LogicalType::String,
            convert_values(col.values, |s| format_timestamp(s).map_or(Value::Null, Value::Str)),
        ),
        LogicalType::Int => (
            LogicalType::Int,
            convert_values(col.values, |s| cast_int(s).map_or(Value::Null, Value::Int)),
        ),
        LogicalType::Long => (
            LogicalType::Long,
            convert_values(col.values, |s| cast_long(s).map_or(Value::Null, Value::Long)),
        ),
        LogicalType::Double => (
            LogicalType::Double,
            convert_values(col.values, |s| {
                cast_double(s).map_or(Value::Null, |d| Value::Double(OrderedFloat(d)))
            }),
        ),
        LogicalType::Date => (
            LogicalType::Date,
            convert_values(col.values, |s| cast_date(s).map_or(Value::Null, Value::Date)),
        ),
    };
    Column {
        name: col.name,
        kind,
        values,
    }
}

/// Coerce every column the schema declares to its declared type.
///
/// Columns absent from the schema are left untouched; schema fields absent from
/// the record set are ignored.
#[must_use]
pub fn cast_to_schema(records: RecordSet, schema: &SchemaDescriptor) -> RecordSet {
    records.map_columns(|col| match schema.field(&col.name) {
        Some(field) => cast_column(col, field.logical_type),
        None => col,
    })
}

// ----------------------------------------------------------------------------
// 7. De-duplication
// ----------------------------------------------------------------------------

/// Keep the first occurrence of every distinct row, preserving order.
#[must_use]
pub fn drop_duplicates(records: RecordSet) -> RecordSet {
    let keep: Vec<usize> = {
        let mut seen: HashSet<Vec<&Value>> = HashSet::with_capacity(records.num_rows());
        (0..records.num_rows())
            .filter(|&i| seen.insert(records.row(i)))
            .collect()
    };
    if keep.len() == records.num_rows() {
        return records;
    }
    debug!(
        before = records.num_rows(),
        after = keep.len(),
        "dropped duplicate rows"
    );
    records.take_rows(&keep)
}
