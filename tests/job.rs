use anyhow::Result;
use rawstage::error::StageError;
use rawstage::job::{JobRun, JobStatus};
use rawstage::logging;
use rawstage::testing::*;

#[test]
fn exit_codes() {
    assert_eq!(JobStatus::Succeeded.exit_code(false), 0);
    assert_eq!(JobStatus::Succeeded.exit_code(true), 0);
    assert_eq!(JobStatus::Degraded.exit_code(false), 0);
    assert_eq!(JobStatus::Degraded.exit_code(true), 2);
    assert_eq!(JobStatus::Failed.exit_code(false), 1);
    assert_eq!(JobStatus::Failed.exit_code(true), 1);
}

#[test]
fn commit_reflects_the_batch_outcome() -> Result<()> {
    logging::init(rawstage::config::LogFormat::Pretty, 0);

    let zone = LandingZone::new();
    zone.put_schema("orders", r#"[{"name": "id", "type": "int"}]"#)?;
    zone.put_csv("2024-03-01", "orders", "a.csv", "id\n1\n")?;
    let driver = zone.driver();

    let job = JobRun::init(driver.config());
    assert_eq!(job.commit(&driver.run_at(fixed_time("2024-03-02T00:00:00"))), JobStatus::Succeeded);

    zone.put_csv("2024-03-01", "nobody", "n.csv", "x\n1\n")?;
    let job = JobRun::init(driver.config());
    assert_eq!(job.commit(&driver.run_at(fixed_time("2024-03-02T00:00:00"))), JobStatus::Degraded);

    let job = JobRun::init(driver.config());
    let aborted = Err(StageError::NoData {
        location: "mem://landing/raw/".into(),
    });
    assert_eq!(job.commit(&aborted), JobStatus::Failed);
    Ok(())
}

#[test]
fn verbosity_directives() {
    assert_eq!(logging::default_directive(0), "rawstage=info,warn");
    assert_eq!(logging::default_directive(1), "rawstage=debug,info");
    assert_eq!(logging::default_directive(7), "rawstage=trace,debug");
}

#[test]
fn repeated_init_keeps_the_first_subscriber() {
    logging::init(rawstage::config::LogFormat::Json, 2);
    logging::init(rawstage::config::LogFormat::Pretty, 0);
    assert!(tracing::dispatcher::has_been_set());
    tracing::info!("still logging after a second init");
}
