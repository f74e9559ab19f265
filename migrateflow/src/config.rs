//! Run configuration.
//!
//! A [`RunConfig`] is built by the caller before any phase runs and is only
//! read while a phase executes.

use crate::errors::MigrationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix for environment variables read by [`RunConfig::from_env`].
pub const ENV_PREFIX: &str = "MIGRATEFLOW_";

/// Where prepared payloads are held between prepare and commit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StagingMode {
    /// Keep prepared payloads in memory.
    #[default]
    Memory,
    /// Spill prepared payloads to a per-run directory under `base_dir`.
    Disk {
        /// Directory the per-run staging directory is created in.
        base_dir: PathBuf,
    },
}

/// Configuration for one orchestrator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Skip the commit phase entirely.
    #[serde(default)]
    pub dry_run: bool,
    /// Write per-unit progress lines to the output sink.
    #[serde(default)]
    pub debug: bool,
    /// Abort the remaining units of a phase on the first unit failure.
    #[serde(default)]
    pub stop_on_error: bool,
    /// How many units of one pipeline may be processed at once.
    #[serde(default = "default_unit_concurrency")]
    pub unit_concurrency: usize,
    /// Run pipelines concurrently. Only safe when pipelines share no
    /// connectors or destination state.
    #[serde(default)]
    pub parallel_pipelines: bool,
    /// Where prepared payloads are held.
    #[serde(default)]
    pub staging: StagingMode,
}

fn default_unit_concurrency() -> usize {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            debug: false,
            stop_on_error: false,
            unit_concurrency: default_unit_concurrency(),
            parallel_pipelines: false,
            staging: StagingMode::default(),
        }
    }
}

impl RunConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets debug mode.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets stop-on-error mode.
    #[must_use]
    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    /// Sets the per-pipeline unit concurrency.
    #[must_use]
    pub fn with_unit_concurrency(mut self, unit_concurrency: usize) -> Self {
        self.unit_concurrency = unit_concurrency;
        self
    }

    /// Enables or disables concurrent pipelines.
    #[must_use]
    pub fn with_parallel_pipelines(mut self, parallel: bool) -> Self {
        self.parallel_pipelines = parallel;
        self
    }

    /// Spills prepared payloads to disk under `base_dir`.
    #[must_use]
    pub fn with_disk_staging(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.staging = StagingMode::Disk {
            base_dir: base_dir.into(),
        };
        self
    }

    /// Checks the configuration for invalid values.
    pub fn validate(&self) -> Result<(), MigrationError> {
        if self.unit_concurrency == 0 {
            return Err(MigrationError::Config(
                "unit_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, MigrationError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the configuration from `MIGRATEFLOW_*` environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, MigrationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MigrationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        if let Some(v) = get("DRY_RUN") {
            config.dry_run = parse_bool("DRY_RUN", &v)?;
        }
        if let Some(v) = get("DEBUG") {
            config.debug = parse_bool("DEBUG", &v)?;
        }
        if let Some(v) = get("STOP_ON_ERROR") {
            config.stop_on_error = parse_bool("STOP_ON_ERROR", &v)?;
        }
        if let Some(v) = get("PARALLEL_PIPELINES") {
            config.parallel_pipelines = parse_bool("PARALLEL_PIPELINES", &v)?;
        }
        if let Some(v) = get("UNIT_CONCURRENCY") {
            config.unit_concurrency = v.trim().parse().map_err(|_| {
                MigrationError::Config(format!(
                    "{ENV_PREFIX}UNIT_CONCURRENCY must be a positive integer, got '{v}'"
                ))
            })?;
        }
        if let Some(v) = get("STAGING_DIR") {
            if !v.trim().is_empty() {
                config.staging = StagingMode::Disk {
                    base_dir: PathBuf::from(v),
                };
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, MigrationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(MigrationError::Config(format!(
            "{ENV_PREFIX}{name} must be a boolean, got '{other}'"
        ))),
    }
}
