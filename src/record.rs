//! Columnar in-memory record sets.
//!
//! A [`RecordSet`] is an ordered list of named [`Column`]s of equal length. Raw
//! data read from delimited text starts out with every column typed as
//! [`LogicalType::String`]; the cleaning stages produce new record sets whose
//! columns carry the types declared in the table schema.
//!
//! Values are hashable and totally ordered (doubles go through
//! [`OrderedFloat`]) so whole rows can be compared for de-duplication.

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Logical column type, as declared in a table schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    #[default]
    String,
    Int,
    Long,
    Double,
    Date,
    Timestamp,
}

impl LogicalType {
    /// Map a declared type name onto a logical type.
    ///
    /// The mapping is total: anything outside the recognized set is a string.
    #[must_use]
    pub fn from_declared(name: &str) -> Self {
        match name {
            "int" => Self::Int,
            "long" => Self::Long,
            "double" => Self::Double,
            "date" => Self::Date,
            "timestamp" => Self::Timestamp,
            _ => Self::String,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Null,
    Str(String),
    Int(i32),
    Long(i64),
    Double(OrderedFloat<f64>),
    Date(NaiveDate),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string payload, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Option<&str>> for Value {
    fn from(v: Option<&str>) -> Self {
        v.map_or(Self::Null, |s| Self::Str(s.to_string()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Str(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: LogicalType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: LogicalType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    /// A string column built from optional raw values.
    pub fn strings<'a, I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        Self::new(
            name,
            LogicalType::String,
            values.into_iter().map(Value::from).collect(),
        )
    }

    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self.kind, LogicalType::String)
    }

    /// Apply `f` to every string value, leaving nulls alone.
    #[must_use]
    pub fn map_strings(self, f: impl Fn(&str) -> String) -> Self {
        let values = self
            .values
            .into_iter()
            .map(|v| match v {
                Value::Str(s) => Value::Str(f(&s)),
                other => other,
            })
            .collect();
        Self { values, ..self }
    }
}

/// Columns passed to [`RecordSet::from_columns`] had differing lengths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column '{column}' has {found} values, expected {expected}")]
pub struct ShapeError {
    pub column: String,
    pub expected: usize,
    pub found: usize,
}

/// An ordered set of equal-length columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    columns: Vec<Column>,
    num_rows: usize,
}

impl RecordSet {
    /// Build a record set, checking that every column has the same length.
    ///
    /// # Errors
    /// Returns a [`ShapeError`] naming the first column whose length differs from
    /// the first column's.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, ShapeError> {
        let num_rows = columns.first().map_or(0, |c| c.values.len());
        if let Some(bad) = columns.iter().find(|c| c.values.len() != num_rows) {
            return Err(ShapeError {
                column: bad.name.clone(),
                expected: num_rows,
                found: bad.values.len(),
            });
        }
        Ok(Self { columns, num_rows })
    }

    /// Build a record set of string columns from a header and row-major values.
    ///
    /// # Errors
    /// Returns a [`ShapeError`] if a row's width differs from the header's.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, ShapeError> {
        let width = headers.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|h| Column::new(h, LogicalType::String, Vec::with_capacity(rows.len())))
            .collect();
        for row in rows {
            if row.len() != width {
                return Err(ShapeError {
                    column: format!("<row of width {}>", row.len()),
                    expected: width,
                    found: row.len(),
                });
            }
            for (col, v) in columns.iter_mut().zip(row) {
                col.values.push(v);
            }
        }
        Self::from_columns(columns)
    }

    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Replace the column of the same name in place, or append it at the end.
    ///
    /// # Errors
    /// Returns a [`ShapeError`] if the column's length does not match.
    pub fn with_column(mut self, column: Column) -> Result<Self, ShapeError> {
        if !self.columns.is_empty() && column.values.len() != self.num_rows {
            return Err(ShapeError {
                column: column.name,
                expected: self.num_rows,
                found: column.values.len(),
            });
        }
        if self.columns.is_empty() {
            self.num_rows = column.values.len();
        }
        match self.position(&column.name) {
            Some(i) => self.columns[i] = column,
            None => self.columns.push(column),
        }
        Ok(self)
    }

    /// Append (or replace) a string column holding the same value on every row.
    #[must_use]
    pub fn with_literal(self, name: &str, value: &str) -> Self {
        let values = vec![Value::str(value); self.num_rows];
        let column = Column::new(name, LogicalType::String, values);
        let num_rows = self.num_rows;
        let mut columns = self.columns;
        match columns.iter().position(|c| c.name == name) {
            Some(i) => columns[i] = column,
            None => columns.push(column),
        }
        Self { columns, num_rows }
    }

    /// Drop a column by name; a missing name is a no-op.
    #[must_use]
    pub fn without_column(mut self, name: &str) -> Self {
        self.columns.retain(|c| c.name != name);
        self
    }

    /// Rebuild the record set column by column.
    ///
    /// The closure must preserve column length; stage functions rely on this to
    /// stay infallible.
    #[must_use]
    pub fn map_columns(self, f: impl FnMut(Column) -> Column) -> Self {
        let num_rows = self.num_rows;
        let columns: Vec<Column> = self.columns.into_iter().map(f).collect();
        debug_assert!(columns.iter().all(|c| c.values.len() == num_rows));
        Self { columns, num_rows }
    }

    /// Borrow row `i` as a vector of cell references.
    ///
    /// # Panics
    /// Panics if `i >= self.num_rows()`.
    #[must_use]
    pub fn row(&self, i: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[i]).collect()
    }

    /// Keep only the rows whose indices are listed, in the given order.
    #[must_use]
    pub fn take_rows(self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .into_iter()
            .map(|c| {
                let values = indices.iter().map(|&i| c.values[i].clone()).collect();
                Column { values, ..c }
            })
            .collect();
        Self {
            columns,
            num_rows: indices.len(),
        }
    }
}
