//! Configuration types for sandboxlet

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::container::RuntimeCommand;
use crate::error::{RuntimeError, RuntimeResult};

/// Top-level client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Runtime client configuration
    pub runtime: RuntimeConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> RuntimeResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> RuntimeResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| RuntimeError::Config(format!("Failed to parse config: {}", e)))?;
        config.runtime.validate()?;
        Ok(config)
    }
}

/// Runtime client configuration
///
/// Loaded once when the client is built and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Candidate locations of the runtime binary, searched in order
    pub binary_candidates: Vec<PathBuf>,
    /// Network mode passed when starting an instance
    pub network: String,
    /// Whether the runtime implements pause/resume
    pub supports_pause: bool,
    /// Maximum concurrent start invocations (non-positive means unbounded)
    pub max_parallel_runs: i64,
    pub run_timeout_secs: u64,
    pub rm_timeout_secs: u64,
    pub pull_timeout_secs: u64,
    pub ps_timeout_secs: u64,
    pub pause_timeout_secs: u64,
    pub unpause_timeout_secs: u64,
    pub version_timeout_secs: u64,
    pub inspect_timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            binary_candidates: vec![
                PathBuf::from("/usr/local/bin/runsc"),
                PathBuf::from("/usr/bin/runsc"),
                PathBuf::from("/bin/runsc"),
            ],
            network: "none".to_string(),
            supports_pause: false,
            max_parallel_runs: 10,
            run_timeout_secs: 60,
            rm_timeout_secs: 60,
            pull_timeout_secs: 600,
            ps_timeout_secs: 60,
            pause_timeout_secs: 10,
            unpause_timeout_secs: 10,
            version_timeout_secs: 10,
            inspect_timeout_secs: 60,
        }
    }
}

impl RuntimeConfig {
    /// Timeout configured for a command
    pub fn timeout_for(&self, command: RuntimeCommand) -> Duration {
        let secs = match command {
            RuntimeCommand::Run => self.run_timeout_secs,
            RuntimeCommand::Remove => self.rm_timeout_secs,
            RuntimeCommand::Pull => self.pull_timeout_secs,
            RuntimeCommand::List => self.ps_timeout_secs,
            RuntimeCommand::Pause => self.pause_timeout_secs,
            RuntimeCommand::Unpause => self.unpause_timeout_secs,
            RuntimeCommand::Version => self.version_timeout_secs,
            RuntimeCommand::Inspect => self.inspect_timeout_secs,
        };
        Duration::from_secs(secs)
    }

    /// Admission gate capacity, if bounded
    pub fn run_parallelism(&self) -> Option<usize> {
        usize::try_from(self.max_parallel_runs)
            .ok()
            .filter(|n| *n > 0)
    }

    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.binary_candidates.is_empty() {
            return Err(RuntimeError::Config(
                "binary_candidates must list at least one path".to_string(),
            ));
        }
        if self.network.trim().is_empty() {
            return Err(RuntimeError::Config("network must not be empty".to_string()));
        }
        for command in RuntimeCommand::ALL {
            if self.timeout_for(command).is_zero() {
                return Err(RuntimeError::Config(format!(
                    "timeout for '{}' must be greater than zero",
                    command
                )));
            }
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Include event targets in log lines
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}
