//! Job lifecycle bookkeeping.
//!
//! A [`JobRun`] is opened before the batch is located and committed once every
//! file has been attempted, whatever the outcome.

use crate::config::JobConfig;
use crate::driver::BatchSummary;
use crate::error::StageResult;
use std::time::Instant;
use tracing::{error, info, warn};

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Every file was written.
    Succeeded,
    /// At least one file failed; the rest were written.
    Degraded,
    /// The run aborted before processing files.
    Failed,
}

impl JobStatus {
    /// Process exit code for this status.
    ///
    /// Degraded runs exit `0` unless `fail_on_degraded` is set.
    #[must_use]
    pub const fn exit_code(self, fail_on_degraded: bool) -> u8 {
        match self {
            Self::Succeeded => 0,
            Self::Degraded if fail_on_degraded => 2,
            Self::Degraded => 0,
            Self::Failed => 1,
        }
    }
}

#[derive(Debug)]
pub struct JobRun {
    name: String,
    started: Instant,
}

impl JobRun {
    #[must_use]
    pub fn init(config: &JobConfig) -> Self {
        info!(
            job = %config.job_name,
            bucket = %config.bucket,
            input = %config.input_folder,
            output = %config.output_folder,
            schemas = %config.schema_folder,
            database = %config.database,
            "job started"
        );
        Self {
            name: config.job_name.clone(),
            started: Instant::now(),
        }
    }

    /// Close the run and report its status.
    #[must_use]
    pub fn commit(self, outcome: &StageResult<BatchSummary>) -> JobStatus {
        let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(summary) if summary.is_degraded() => {
                for (key, e) in summary.failures() {
                    warn!(job = %self.name, key, error = %e, "file failed");
                }
                warn!(
                    job = %self.name,
                    date = %summary.date,
                    succeeded = summary.succeeded(),
                    failed = summary.failed(),
                    elapsed_ms,
                    "job committed (degraded)"
                );
                JobStatus::Degraded
            }
            Ok(summary) => {
                info!(
                    job = %self.name,
                    date = %summary.date,
                    succeeded = summary.succeeded(),
                    elapsed_ms,
                    "job committed"
                );
                JobStatus::Succeeded
            }
            Err(e) => {
                error!(job = %self.name, error = %e, elapsed_ms, "job failed");
                JobStatus::Failed
            }
        }
    }
}
