//! `rawstage` - clean the latest raw batch into the staging zone.

use anyhow::{Context, Result};
use clap::Parser;
use rawstage::config::{ConfigOverrides, JobConfig, LogFormat};
use rawstage::driver::BatchDriver;
use rawstage::io::cloud::{LocalObjectIO, ObjectCatalog, ObjectIO};
use rawstage::job::{JobRun, JobStatus};
use rawstage::logging;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

/// Clean the latest dated batch of raw CSV files into typed Parquet partitions.
#[derive(Parser, Debug)]
#[command(name = "rawstage", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Job name used in logs
    #[arg(long)]
    job_name: Option<String>,

    /// Bucket holding raw input, schemas and staging output
    #[arg(long)]
    bucket: Option<String>,

    /// Raw input folder, e.g. `raw/`
    #[arg(long)]
    input_folder: Option<String>,

    /// Staging output folder, e.g. `staging/`
    #[arg(long)]
    output_folder: Option<String>,

    /// Folder holding `<table>.json` schema declarations
    #[arg(long)]
    schema_folder: Option<String>,

    /// Catalog database tables are registered under
    #[arg(long)]
    database: Option<String>,

    /// Root directory of the local object store
    #[arg(long)]
    storage_root: Option<PathBuf>,

    /// Exit with status 2 when any file fails (`--fail-on-degraded=false` turns it off)
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    fail_on_degraded: Option<bool>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            job_name: self.job_name.clone(),
            bucket: self.bucket.clone(),
            input_folder: self.input_folder.clone(),
            output_folder: self.output_folder.clone(),
            schema_folder: self.schema_folder.clone(),
            database: self.database.clone(),
            storage_root: self.storage_root.clone(),
            fail_on_degraded: self.fail_on_degraded,
            log_format: self.json_logs.then_some(LogFormat::Json),
        }
    }
}

fn run(config: JobConfig) -> Result<JobStatus> {
    let store: Arc<dyn ObjectIO> = Arc::new(LocalObjectIO::new(&config.storage_root));
    anyhow::ensure!(
        config.storage_root.is_dir(),
        "storage root {} is not a directory",
        config.storage_root.display()
    );
    let catalog = Arc::new(ObjectCatalog::new(Arc::clone(&store), config.bucket.clone()));
    let driver = BatchDriver::new(config, store, catalog);

    let job = JobRun::init(driver.config());
    let outcome = driver.run();
    let status = job.commit(&outcome);
    if let Err(e) = outcome
        && e.is_fatal()
    {
        return Err(e).context("batch aborted");
    }
    Ok(status)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match JobConfig::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            logging::init(LogFormat::Pretty, cli.verbose);
            error!(error = %e, "could not load configuration");
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.log_format, cli.verbose);

    let fail_on_degraded = config.fail_on_degraded;
    match run(config) {
        Ok(status) => ExitCode::from(status.exit_code(fail_on_degraded)),
        Err(e) => {
            error!(error = %format!("{e:#}"), "exiting");
            ExitCode::FAILURE
        }
    }
}
