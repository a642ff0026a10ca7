//! Configuration structures for the TCA batch job.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable for the executions file.
pub const ENV_EXECUTIONS: &str = "EXECUTIONS_FILE_PATH";
/// Environment variable for the reference-data file.
pub const ENV_REFDATA: &str = "REFDATA_FILE_PATH";
/// Environment variable for the market-data file.
pub const ENV_MARKETDATA: &str = "MARKETDATA_FILE_PATH";
/// Environment variable for the output file.
pub const ENV_OUTPUT: &str = "OUTPUT_FILE_PATH";
/// Environment variable for the matcher worker count.
pub const ENV_WORKERS: &str = "TCA_WORKERS";

/// Main configuration for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input and output file locations.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Matching configuration.
    #[serde(default)]
    pub matching: MatchingConfig,
}

impl Config {
    /// Load a configuration from a JSON file. Missing sections take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_EXECUTIONS) {
            self.paths.executions = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_REFDATA) {
            self.paths.refdata = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_MARKETDATA) {
            self.paths.marketdata = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_OUTPUT) {
            self.paths.output = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_WORKERS) {
            self.matching.workers = v
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("{ENV_WORKERS} must be a non-negative integer, got '{v}'")))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check that every path is set.
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("executions", &self.paths.executions),
            ("refdata", &self.paths.refdata),
            ("marketdata", &self.paths.marketdata),
            ("output", &self.paths.output),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(Error::config(format!("{name} path is empty")));
            }
        }
        Ok(())
    }
}

/// File locations for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw executions (parquet).
    pub executions: PathBuf,
    /// Instrument reference data (parquet).
    pub refdata: PathBuf,
    /// Raw quote ticks (parquet).
    pub marketdata: PathBuf,
    /// Scored output (parquet).
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            executions: PathBuf::from("data/executions.parquet"),
            refdata: PathBuf::from("data/refdata.parquet"),
            marketdata: PathBuf::from("data/marketdata.parquet"),
            output: PathBuf::from("output/trading_metrics.parquet"),
        }
    }
}

/// Trade-to-quote matching configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Number of parallel workers (0 = auto).
    pub workers: usize,
}
