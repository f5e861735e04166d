//! Job configuration.
//!
//! Sources are merged in increasing priority:
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. Environment variables prefixed `RAWSTAGE_` (e.g. `RAWSTAGE_BUCKET`)
//! 4. Explicit overrides (command-line flags)

use crate::error::{StageError, StageResult};
use crate::io::cloud::helpers::{normalize_prefix, validate_resource_name};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output format of the stderr log layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Parameters of one raw-to-staging run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub job_name: String,
    /// Bucket holding raw input, schemas, staging output and the catalog.
    pub bucket: String,
    pub input_folder: String,
    pub output_folder: String,
    pub schema_folder: String,
    /// Catalog database tables are registered under.
    pub database: String,
    /// Directory backing the local object store.
    pub storage_root: PathBuf,
    /// Exit non-zero when any file fails.
    pub fail_on_degraded: bool,
    pub log_format: LogFormat,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job_name: "raw-to-staging".to_string(),
            bucket: String::new(),
            input_folder: "raw/".to_string(),
            output_folder: "staging/".to_string(),
            schema_folder: "schemas/".to_string(),
            database: String::new(),
            storage_root: PathBuf::from("."),
            fail_on_degraded: false,
            log_format: LogFormat::Pretty,
        }
    }
}

/// Command-line overrides; `None` leaves the lower layers in effect.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_degraded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<LogFormat>,
}

impl JobConfig {
    /// The layered figment, exposed so callers can inspect provenance.
    #[must_use]
    pub fn figment(file: Option<&Path>, overrides: &ConfigOverrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed("RAWSTAGE_"))
            .merge(Serialized::defaults(overrides))
    }

    /// Load, normalize and validate the configuration.
    ///
    /// # Errors
    /// Returns [`StageError::Config`] if a source can't be parsed or a required
    /// value is missing.
    pub fn load(file: Option<&Path>, overrides: &ConfigOverrides) -> StageResult<Self> {
        if let Some(path) = file
            && !path.is_file()
        {
            return Err(StageError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        let config: Self = Self::figment(file, overrides)
            .extract()
            .map_err(|e| StageError::Config(e.to_string()))?;
        config.normalized().validated()
    }

    /// Folder prefixes in canonical `name/` form.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.input_folder = normalize_prefix(&self.input_folder);
        self.output_folder = normalize_prefix(&self.output_folder);
        self.schema_folder = normalize_prefix(&self.schema_folder);
        self
    }

    /// Check required values.
    ///
    /// # Errors
    /// Returns [`StageError::Config`] naming the offending key.
    pub fn validated(self) -> StageResult<Self> {
        validate_resource_name(&self.bucket)
            .map_err(|e| StageError::Config(format!("bucket: {}", e.message)))?;
        validate_resource_name(&self.database)
            .map_err(|e| StageError::Config(format!("database: {}", e.message)))?;
        if self.job_name.trim().is_empty() {
            return Err(StageError::Config("job_name: must not be empty".to_string()));
        }
        Ok(self)
    }
}
