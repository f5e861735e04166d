//! End-to-end runs of the batch driver against an in-memory landing zone.

use anyhow::Result;
use rawstage::driver::*;
use rawstage::error::{StageError, StageResult};
use rawstage::io::cloud::{CatalogIO, ObjectIO};
use rawstage::record::{LogicalType, Value};
use rawstage::schema::{FieldDeclaration, SchemaDescriptor, SchemaResolver};
use rawstage::testing::*;
use std::sync::Arc;

const ORDERS_SCHEMA: &str = r#"[
    {"name": "order_id", "type": "long"},
    {"name": "qty", "type": "int"},
    {"name": "placed_at", "type": "timestamp"}
]"#;

const ORDERS_CSV: &str = "Order ID,Qty,Placed At\n\
                          1, 2 ,2024-03-01 09:00:00\n\
                          1,2,2024-03-01 09:00:00\n\
                          2,,bad\n";

const USERS_SCHEMA: &str = r#"[{"name": "user_id", "type": "int"}]"#;

const USERS_CSV: &str = "User ID,Mobile-Phone,Email\n\
                         10,555-0100,a@x.io or a@y.io\n\
                         11,,b@x.io\n";

const RUN_AT: &str = "2024-03-02T08:00:00";

fn seeded_zone() -> Result<LandingZone> {
    let zone = LandingZone::new();
    zone.put_schema("orders", ORDERS_SCHEMA)?;
    zone.put_schema("users", USERS_SCHEMA)?;
    zone.put_csv("2024-02-28", "orders", "old.csv", "Order ID\n99\n")?;
    zone.put_csv("2024-03-01", "orders", "a.csv", ORDERS_CSV)?;
    zone.put_csv("2024-03-01", "users", "u.csv", USERS_CSV)?;
    zone.put_raw("raw/2024-03-01/users/_SUCCESS", "")?;
    Ok(zone)
}

#[test]
fn latest_batch_is_cleaned_written_and_registered() -> Result<()> {
    let zone = seeded_zone()?;
    let summary = zone.driver().run_at(fixed_time(RUN_AT))?;

    assert_eq!(summary.date, "2024-03-01");
    assert_eq!(summary.timestamp, RUN_AT);
    assert_eq!(summary.succeeded(), 2);
    assert!(!summary.is_degraded());

    let writes: Vec<(&str, usize, &str)> = summary
        .writes()
        .map(|w| (w.table.as_str(), w.rows, w.qualified_name.as_str()))
        .collect();
    assert_eq!(
        writes,
        vec![("orders", 2, "staging_db.orders"), ("users", 2, "staging_db.users")]
    );

    let orders = zone.read_output("2024-03-02", "orders")?;
    assert_eq!(
        orders.column_names(),
        vec!["order_id", "qty", "placed_at", SOURCE_PATH_COLUMN, UPDATED_TIME_COLUMN]
    );
    assert_eq!(
        orders.column("order_id").unwrap().values,
        vec![Value::Long(1), Value::Long(2)]
    );
    assert_eq!(
        orders.column("qty").unwrap().values,
        vec![Value::Int(2), Value::Null]
    );
    assert_eq!(
        column_strings(&orders, "placed_at"),
        vec![Some("2024-03-01T9:00:00".into()), None]
    );
    assert_eq!(
        column_strings(&orders, SOURCE_PATH_COLUMN),
        vec![Some("mem://landing/raw/2024-03-01/orders/a.csv".into()); 2]
    );
    assert_eq!(
        column_strings(&orders, UPDATED_TIME_COLUMN),
        vec![Some(RUN_AT.into()); 2]
    );

    let users = zone.read_output("2024-03-02", "users")?;
    assert_eq!(
        users.column("user_id").unwrap().values,
        vec![Value::Int(10), Value::Int(11)]
    );
    assert_eq!(
        column_strings(&users, "mobile_phone"),
        vec![Some("5550100".into()), Some("None".into())]
    );
    assert_eq!(
        column_strings(&users, "email_part2"),
        vec![Some("a@y.io".into()), Some("None".into())]
    );

    assert_eq!(
        zone.catalog.table_names(),
        vec!["staging_db.orders", "staging_db.users"]
    );
    let entry = zone.catalog.get_table("staging_db", "orders")?;
    assert_eq!(entry.location, "mem://landing/staging/2024-03-02/orders/");
    assert_eq!(entry.format, "parquet");
    let declared: Vec<&str> = entry.columns.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(declared, orders.column_names());
    Ok(())
}

#[test]
fn split_parts_precede_provenance_columns() -> Result<()> {
    let zone = seeded_zone()?;
    zone.driver().run_at(fixed_time(RUN_AT))?;
    let users = zone.read_output("2024-03-02", "users")?;
    assert_eq!(
        users.column_names(),
        vec![
            "user_id",
            "mobile_phone",
            "email_part1",
            "email_part2",
            SOURCE_PATH_COLUMN,
            UPDATED_TIME_COLUMN,
        ]
    );
    Ok(())
}

#[test]
fn missing_schema_fails_only_that_file() -> Result<()> {
    let zone = seeded_zone()?;
    zone.put_csv("2024-03-01", "payments", "p.csv", "Amount\n1\n")?;

    let summary = zone.driver().run_at(fixed_time(RUN_AT))?;
    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failed(), 1);
    assert!(summary.is_degraded());

    let failures: Vec<(&str, &StageError)> = summary.failures().collect();
    assert_eq!(failures[0].0, "raw/2024-03-01/payments/p.csv");
    assert!(matches!(
        failures[0].1,
        StageError::SchemaLoad { table, .. } if table == "payments"
    ));
    assert!(zone.output_bytes("2024-03-02", "payments").is_err());
    assert!(zone.read_output("2024-03-02", "users").is_ok());
    Ok(())
}

#[test]
fn write_failure_is_isolated() -> Result<()> {
    let zone = seeded_zone()?;
    zone.store.fail_puts_under("staging/2024-03-02/orders/");

    let summary = zone.driver().run_at(fixed_time(RUN_AT))?;
    assert_eq!(summary.failed(), 1);
    let outcome = summary
        .outcomes
        .iter()
        .find(|o| o.table.as_deref() == Some("orders"))
        .unwrap();
    assert!(matches!(outcome.result, Err(StageError::Write { .. })));

    assert!(zone.read_output("2024-03-02", "users").is_ok());
    assert_eq!(zone.catalog.table_names(), vec!["staging_db.users"]);
    Ok(())
}

#[test]
fn unreadable_file_is_a_transform_failure() -> Result<()> {
    let zone = seeded_zone()?;
    zone.store
        .put_object(TEST_BUCKET, "raw/2024-03-01/users/bad.csv", b"User ID\n\xff\xfe\n")?;

    let summary = zone.driver().run_at(fixed_time(RUN_AT))?;
    let failures: Vec<(&str, &StageError)> = summary.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "raw/2024-03-01/users/bad.csv");
    assert!(matches!(failures[0].1, StageError::Transform { .. }));
    Ok(())
}

#[test]
fn file_outside_a_table_folder_fails() -> Result<()> {
    let zone = seeded_zone()?;
    zone.put_raw("raw/2024-03-01/loose.csv", "a\n1\n")?;

    let summary = zone.driver().run_at(fixed_time(RUN_AT))?;
    assert_eq!(summary.outcomes.len(), 3);
    let loose = &summary.outcomes[0];
    assert_eq!(loose.key, "raw/2024-03-01/loose.csv");
    assert_eq!(loose.table, None);
    assert!(matches!(loose.result, Err(StageError::Transform { .. })));
    assert_eq!(summary.succeeded(), 2);
    Ok(())
}

#[test]
fn empty_input_root_is_no_data() {
    let zone = LandingZone::new();
    let err = zone.driver().run_at(fixed_time(RUN_AT)).unwrap_err();
    assert!(matches!(err, StageError::NoData { .. }));
    assert!(err.is_fatal());
}

#[test]
fn date_folder_without_csv_files_is_an_empty_success() -> Result<()> {
    let zone = LandingZone::new();
    zone.put_raw("raw/2024-03-01/orders/_SUCCESS", "")?;
    let summary = zone.driver().run_at(fixed_time(RUN_AT))?;
    assert!(summary.outcomes.is_empty());
    assert!(!summary.is_degraded());
    Ok(())
}

#[test]
fn rerun_overwrites_the_partition() -> Result<()> {
    let zone = seeded_zone()?;
    let stale = format!(
        "{}2024-03-02/orders/part-00001-stale.snappy.parquet",
        zone.config.output_folder
    );
    zone.put_raw(&stale, "stale")?;

    zone.driver().run_at(fixed_time(RUN_AT))?;
    let keys = zone.store.keys(TEST_BUCKET);
    assert!(!keys.contains(&stale));
    assert!(keys.contains(&zone.output_key("2024-03-02", "orders")));
    Ok(())
}

#[test]
fn identical_inputs_and_timestamp_give_identical_output() -> Result<()> {
    let zone = seeded_zone()?;
    let driver = zone.driver();

    driver.run_at(fixed_time(RUN_AT))?;
    let first = zone.output_bytes("2024-03-02", "orders")?;
    driver.run_at(fixed_time(RUN_AT))?;
    let second = zone.output_bytes("2024-03-02", "orders")?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn later_file_of_the_same_table_replaces_earlier_one() -> Result<()> {
    let zone = seeded_zone()?;
    zone.put_csv("2024-03-01", "orders", "b.csv", "Order ID\n7\n")?;

    let summary = zone.driver().run_at(fixed_time(RUN_AT))?;
    assert_eq!(summary.succeeded(), 3);
    let orders = zone.read_output("2024-03-02", "orders")?;
    assert_eq!(orders.column("order_id").unwrap().values, vec![Value::Long(7)]);
    assert_eq!(
        column_strings(&orders, SOURCE_PATH_COLUMN),
        vec![Some("mem://landing/raw/2024-03-01/orders/b.csv".into())]
    );
    Ok(())
}

struct FixedResolver(SchemaDescriptor);

impl SchemaResolver for FixedResolver {
    fn resolve(&self, _table: &str) -> StageResult<SchemaDescriptor> {
        Ok(self.0.clone())
    }
}

#[test]
fn custom_resolver_replaces_declarations() -> Result<()> {
    let zone = LandingZone::new();
    zone.put_csv("2024-03-01", "anything", "a.csv", "Score\n1.5\n")?;
    let schema = SchemaDescriptor::new(vec![FieldDeclaration::new("score", LogicalType::Double)])
        .map_err(anyhow::Error::msg)?;

    let summary = zone
        .driver()
        .with_resolver(Arc::new(FixedResolver(schema)))
        .run_at(fixed_time(RUN_AT))?;
    assert_eq!(summary.succeeded(), 1);

    let out = zone.read_output("2024-03-02", "anything")?;
    assert_eq!(out.column("score").map(|c| c.kind), Some(LogicalType::Double));
    Ok(())
}

#[test]
fn locate_reports_the_batch_without_processing() -> Result<()> {
    let zone = seeded_zone()?;
    let driver = zone.driver();
    let batch = driver.locate(fixed_time(RUN_AT))?;

    assert_eq!(batch.date, "2024-03-01");
    assert_eq!(batch.date_prefix, "raw/2024-03-01/");
    assert_eq!(batch.partition_date(), "2024-03-02");
    assert_eq!(batch.files.len(), 2);
    assert_eq!(driver.partition_prefix("2024-03-02", "users"), "staging/2024-03-02/users/");
    assert!(zone.store.keys(TEST_BUCKET).iter().all(|k| !k.starts_with("staging/")));
    Ok(())
}

#[test]
fn batch_timestamp_format() {
    assert_eq!(batch_timestamp(fixed_time("2024-01-05T07:08:09")), "2024-01-05T07:08:09");
}
