//! Storage, text and columnar I/O.

pub mod cloud;
pub mod csv;
pub mod glob;
pub mod parquet;
