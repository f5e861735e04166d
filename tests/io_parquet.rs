use anyhow::Result;
use arrow::datatypes::DataType;
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use rawstage::io::parquet::{arrow_schema, arrow_type, read_parquet_bytes, write_parquet_bytes};
use rawstage::record::{Column, LogicalType, RecordSet, Value};

fn typed_records() -> Result<RecordSet> {
    Ok(RecordSet::from_columns(vec![
        Column::new(
            "qty",
            LogicalType::Int,
            vec![Value::Int(3), Value::Null, Value::Int(-1)],
        ),
        Column::new(
            "id",
            LogicalType::Long,
            vec![Value::Long(9_000_000_000), Value::Long(1), Value::Null],
        ),
        Column::new(
            "price",
            LogicalType::Double,
            vec![Value::Double(OrderedFloat(2.5)), Value::Null, Value::Double(OrderedFloat(0.0))],
        ),
        Column::new(
            "day",
            LogicalType::Date,
            vec![
                Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
                Value::Date(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()),
                Value::Null,
            ],
        ),
        Column::strings("note", [Some("a"), None, Some("None")]),
    ])?)
}

#[test]
fn type_mapping() {
    assert_eq!(arrow_type(LogicalType::String), DataType::Utf8);
    assert_eq!(arrow_type(LogicalType::Timestamp), DataType::Utf8);
    assert_eq!(arrow_type(LogicalType::Int), DataType::Int32);
    assert_eq!(arrow_type(LogicalType::Long), DataType::Int64);
    assert_eq!(arrow_type(LogicalType::Double), DataType::Float64);
    assert_eq!(arrow_type(LogicalType::Date), DataType::Date32);
}

#[test]
fn schema_follows_column_order() -> Result<()> {
    let schema = arrow_schema(&typed_records()?);
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["qty", "id", "price", "day", "note"]);
    assert!(schema.fields().iter().all(|f| f.is_nullable()));
    Ok(())
}

#[test]
fn typed_values_survive_parquet() -> Result<()> {
    let records = typed_records()?;
    let bytes = write_parquet_bytes(&records)?;
    assert_eq!(&bytes[..4], b"PAR1");

    let back = read_parquet_bytes(bytes)?;
    assert_eq!(back, records);
    Ok(())
}

#[test]
fn zero_rows_keep_schema() -> Result<()> {
    let records = RecordSet::from_columns(vec![
        Column::new("qty", LogicalType::Int, Vec::new()),
        Column::strings("note", std::iter::empty()),
    ])?;
    let back = read_parquet_bytes(write_parquet_bytes(&records)?)?;
    assert_eq!(back.num_rows(), 0);
    assert_eq!(back.column_names(), vec!["qty", "note"]);
    assert_eq!(back.column("qty").map(|c| c.kind), Some(LogicalType::Int));
    Ok(())
}

#[test]
fn mismatched_value_is_rejected() -> Result<()> {
    let records = RecordSet::from_columns(vec![Column::new(
        "qty",
        LogicalType::Int,
        vec![Value::str("three")],
    )])?;
    assert!(write_parquet_bytes(&records).is_err());
    Ok(())
}

#[test]
fn garbage_bytes_are_rejected() {
    assert!(read_parquet_bytes(b"not parquet".to_vec()).is_err());
}
