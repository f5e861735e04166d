use anyhow::Result;
use rawstage::config::{ConfigOverrides, JobConfig, LogFormat};
use rawstage::error::StageError;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn toml_file(body: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    file.write_all(body.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
fn defaults_fill_unspecified_keys() {
    let config = JobConfig::default();
    assert_eq!(config.job_name, "raw-to-staging");
    assert_eq!(config.input_folder, "raw/");
    assert_eq!(config.output_folder, "staging/");
    assert_eq!(config.schema_folder, "schemas/");
    assert!(!config.fail_on_degraded);
    assert_eq!(config.log_format, LogFormat::Pretty);
}

#[test]
fn file_values_are_loaded_and_normalized() -> Result<()> {
    let file = toml_file(
        r#"
        bucket = "landing"
        database = "staging_db"
        input_folder = "incoming"
        output_folder = "clean///"
        log_format = "json"
        "#,
    )?;
    let config = JobConfig::load(Some(file.path()), &ConfigOverrides::default())?;

    assert_eq!(config.bucket, "landing");
    assert_eq!(config.database, "staging_db");
    assert_eq!(config.input_folder, "incoming/");
    assert_eq!(config.output_folder, "clean/");
    assert_eq!(config.schema_folder, "schemas/");
    assert_eq!(config.log_format, LogFormat::Json);
    Ok(())
}

#[test]
fn overrides_win_over_the_file() -> Result<()> {
    let file = toml_file("bucket = \"landing\"\ndatabase = \"db\"\nfail_on_degraded = false\n")?;
    let overrides = ConfigOverrides {
        bucket: Some("other".into()),
        storage_root: Some(PathBuf::from("/srv/lake")),
        fail_on_degraded: Some(true),
        ..ConfigOverrides::default()
    };
    let config = JobConfig::load(Some(file.path()), &overrides)?;

    assert_eq!(config.bucket, "other");
    assert_eq!(config.database, "db");
    assert_eq!(config.storage_root, PathBuf::from("/srv/lake"));
    assert!(config.fail_on_degraded);
    Ok(())
}

#[test]
fn overrides_alone_are_enough() -> Result<()> {
    let overrides = ConfigOverrides {
        bucket: Some("landing".into()),
        database: Some("db".into()),
        ..ConfigOverrides::default()
    };
    let config = JobConfig::load(None, &overrides)?;
    assert_eq!(config.bucket, "landing");
    assert_eq!(config.job_name, "raw-to-staging");
    Ok(())
}

#[test]
fn missing_required_values_are_config_errors() -> Result<()> {
    let file = toml_file("database = \"db\"\n")?;
    let err = JobConfig::load(Some(file.path()), &ConfigOverrides::default()).unwrap_err();
    assert!(matches!(err, StageError::Config(ref m) if m.starts_with("bucket")), "{err}");
    assert!(err.is_fatal());

    let bad_name = ConfigOverrides {
        bucket: Some("landing".into()),
        database: Some("has space".into()),
        ..ConfigOverrides::default()
    };
    let err = JobConfig::load(None, &bad_name).unwrap_err();
    assert!(err.to_string().contains("database"), "{err}");
    Ok(())
}

#[test]
fn unreadable_sources_are_config_errors() -> Result<()> {
    let missing = JobConfig::load(
        Some(std::path::Path::new("/definitely/not/here.toml")),
        &ConfigOverrides::default(),
    );
    assert!(matches!(missing, Err(StageError::Config(_))));

    let file = toml_file("bucket = [1, 2\n")?;
    let malformed = JobConfig::load(Some(file.path()), &ConfigOverrides::default());
    assert!(matches!(malformed, Err(StageError::Config(_))));
    Ok(())
}

#[test]
fn empty_job_name_is_rejected() {
    let config = JobConfig {
        bucket: "landing".into(),
        database: "db".into(),
        job_name: "  ".into(),
        ..JobConfig::default()
    };
    assert!(config.validated().is_err());
}
