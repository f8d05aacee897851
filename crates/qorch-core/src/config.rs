//! Orchestrator configuration loading and defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, QorchError};
use crate::status::ExecutionMode;

/// YAML-configurable settings for every orchestration pass.
///
/// Loaded once at process start and handed to each component by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// SQLite database holding batches, variants and results.
    #[serde(default = "default_store")]
    pub store: PathBuf,
    /// Submission retry behaviour.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Format of measured-state keys written to raw results.
    #[serde(default)]
    pub keys: KeyFormat,
    /// Metrics stage behaviour.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Values used when registering new batches.
    #[serde(default)]
    pub defaults: RunDefaults,
    /// Spool directory used by the file-backed job runner.
    #[serde(default = "default_spool")]
    pub spool: PathBuf,
}

fn default_store() -> PathBuf {
    PathBuf::from("qorch.sqlite")
}

fn default_spool() -> PathBuf {
    PathBuf::from("qorch-spool")
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            store: default_store(),
            retry: RetryConfig::default(),
            keys: KeyFormat::default(),
            metrics: MetricsConfig::default(),
            defaults: RunDefaults::default(),
            spool: default_spool(),
        }
    }
}

impl OrchestratorConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, QorchError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            QorchError::Config(
                ErrorInfo::new("qorch_core.config_read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|err| {
            QorchError::Config(
                ErrorInfo::new("qorch_core.config_parse", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings no pass can run with.
    pub fn validate(&self) -> Result<(), QorchError> {
        if self.defaults.shots == 0 {
            return Err(QorchError::Config(
                ErrorInfo::new("qorch_core.config_shots", "shots must be positive")
                    .with_hint("set defaults.shots to at least 1"),
            ));
        }
        if self.defaults.runs == 0 {
            return Err(QorchError::Config(
                ErrorInfo::new("qorch_core.config_runs", "runs must be positive")
                    .with_hint("set defaults.runs to at least 1"),
            ));
        }
        Ok(())
    }
}

/// Fixed cool-down between submission attempts. There is no attempt limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Seconds to wait after a failed submission before the next attempt.
    #[serde(default = "default_cool_down_secs")]
    pub cool_down_secs: u64,
}

fn default_cool_down_secs() -> u64 {
    30
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            cool_down_secs: default_cool_down_secs(),
        }
    }
}

impl RetryConfig {
    /// The cool-down as a [`Duration`].
    pub fn cool_down(&self) -> Duration {
        Duration::from_secs(self.cool_down_secs)
    }
}

/// Representation of measured-state keys in stored distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    /// Keep the bitstrings reported by the backend.
    #[default]
    Binary,
    /// Canonicalize bitstrings to decimal integers, dropping non-binary keys.
    Integer,
}

/// What a failed decode does to the enclosing batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DecodeFailurePolicy {
    /// The batch reaches `done` once every variant was attempted.
    #[default]
    Complete,
    /// The batch stays `executed` while any variant carries a decode error.
    HoldExecuted,
}

/// Settings for the metrics pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    /// Handling of variants whose decode failed.
    #[serde(default)]
    pub decode_failure: DecodeFailurePolicy,
}

/// Defaults applied to newly registered batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDefaults {
    /// Owner recorded on the batch.
    #[serde(default = "default_user")]
    pub user: String,
    /// Target backend name passed to the compiler.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Remote submission or local execution.
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Shots per run.
    #[serde(default = "default_shots")]
    pub shots: u32,
    /// Repeated runs per variant.
    #[serde(default = "default_runs")]
    pub runs: u32,
}

fn default_user() -> String {
    "operator".to_string()
}

fn default_backend() -> String {
    "default".to_string()
}

fn default_shots() -> u32 {
    10_000
}

fn default_runs() -> u32 {
    1
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            user: default_user(),
            backend: default_backend(),
            mode: ExecutionMode::default(),
            shots: default_shots(),
            runs: default_runs(),
        }
    }
}
