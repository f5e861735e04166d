use anyhow::Result;
use rawstage::error::StageError;
use rawstage::io::cloud::{FakeObjectIO, ObjectIO};
use rawstage::record::LogicalType;
use rawstage::schema::*;
use std::sync::Arc;

#[test]
fn parse_declaration_maps_types() -> Result<()> {
    let json = br#"[
        {"name": "id", "type": "long"},
        {"name": "qty", "type": "int"},
        {"name": "price", "type": "double"},
        {"name": "day", "type": "date"},
        {"name": "at", "type": "timestamp"},
        {"name": "label", "type": "string"},
        {"name": "amount", "type": "decimal(10,2)"}
    ]"#;
    let schema = parse_declaration(json).map_err(anyhow::Error::msg)?;

    let kinds: Vec<(&str, LogicalType)> = schema
        .fields()
        .iter()
        .map(|f| (f.name.as_str(), f.logical_type))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("id", LogicalType::Long),
            ("qty", LogicalType::Int),
            ("price", LogicalType::Double),
            ("day", LogicalType::Date),
            ("at", LogicalType::Timestamp),
            ("label", LogicalType::String),
            ("amount", LogicalType::String),
        ]
    );
    assert!(schema.contains("price"));
    assert!(!schema.contains("missing"));
    Ok(())
}

#[test]
fn parse_declaration_rejects_bad_input() {
    assert!(parse_declaration(b"{\"name\": \"x\"}").is_err());
    assert!(parse_declaration(b"[{\"name\": \"x\"}]").is_err());
    assert!(parse_declaration(&[0xff, 0xfe]).is_err());

    let dup = br#"[{"name": "a", "type": "int"}, {"name": "a", "type": "long"}]"#;
    let err = parse_declaration(dup).unwrap_err();
    assert!(err.contains("duplicate"), "{err}");
}

#[test]
fn empty_declaration_is_valid() -> Result<()> {
    let schema = parse_declaration(b"[]").map_err(anyhow::Error::msg)?;
    assert!(schema.is_empty());
    Ok(())
}

#[test]
fn object_resolver_reads_declarations() -> Result<()> {
    let store = FakeObjectIO::new();
    store.put_object(
        "lake",
        "schemas/orders.json",
        br#"[{"name": "order_id", "type": "long"}]"#,
    )?;
    let resolver = ObjectSchemaResolver::new(Arc::new(store), "lake", "schemas/");

    assert_eq!(resolver.declaration_key("orders"), "schemas/orders.json");
    let schema = resolver.resolve("orders")?;
    assert_eq!(schema.len(), 1);
    assert_eq!(
        schema.field("order_id").map(|f| f.logical_type),
        Some(LogicalType::Long)
    );
    Ok(())
}

#[test]
fn object_resolver_reports_missing_and_malformed() -> Result<()> {
    let store = FakeObjectIO::new();
    store.put_object("lake", "schemas/broken.json", b"not json")?;
    let resolver = ObjectSchemaResolver::new(Arc::new(store), "lake", "schemas/");

    match resolver.resolve("absent") {
        Err(StageError::SchemaLoad { table, .. }) => assert_eq!(table, "absent"),
        other => panic!("expected SchemaLoad, got {other:?}"),
    }
    let err = resolver.resolve("broken").unwrap_err();
    assert!(matches!(err, StageError::SchemaLoad { .. }));
    assert!(!err.is_fatal());
    Ok(())
}
