//! Configuration management

use crate::health::PollConfig;
use crate::pipeline::{TimeoutPolicy, Validate, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up in the project root
pub const CONFIG_FILE_NAME: &str = "shipline.yaml";

/// Errors loading the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The file is not valid YAML for [`Config`]
    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_yaml::Error,
    },

    /// A setting is out of range
    #[error("Invalid config: {0}")]
    Invalid(#[from] ValidationError),
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level
    pub log_level: String,
    /// Directory all service paths are relative to
    pub project_root: PathBuf,
    /// Command timeouts
    pub timeouts: TimeoutPolicy,
    /// Post-deploy health polling
    pub health: PollConfig,
    /// Container log lines dumped after a failed health check
    pub log_tail_lines: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            project_root: PathBuf::from("."),
            timeouts: TimeoutPolicy::default(),
            health: PollConfig::default(),
            log_tail_lines: 50,
        }
    }
}

impl Config {
    /// Loads and validates a YAML configuration file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves the configuration for a run.
    ///
    /// An explicit path must exist. Otherwise [`CONFIG_FILE_NAME`] in
    /// `project_root` is used when present, and defaults when not.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the chosen file cannot be loaded.
    pub fn resolve(explicit: Option<&Path>, project_root: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let discovered = project_root.join(CONFIG_FILE_NAME);
        if discovered.is_file() {
            tracing::debug!(path = %discovered.display(), "Using discovered config file");
            let mut config = Self::load(&discovered)?;
            if config.project_root.is_relative() {
                config.project_root = project_root.join(&config.project_root);
            }
            return Ok(config);
        }

        Ok(Self {
            project_root: project_root.to_path_buf(),
            ..Self::default()
        })
    }
}

impl Validate for Config {
    type Error = ValidationError;

    fn validate(&self) -> Result<(), Self::Error> {
        self.timeouts.validate()?;

        if self.health.max_attempts == 0 {
            return Err(ValidationError::InvalidAttempts {
                value: self.health.max_attempts,
            });
        }
        if self.health.timeout.is_zero() {
            return Err(ValidationError::InvalidTimeout {
                field: "health.timeout_secs",
                value: 0,
            });
        }
        if tracing_subscriber::EnvFilter::try_new(&self.log_level).is_err() {
            return Err(ValidationError::InvalidLogLevel(self.log_level.clone()));
        }
        Ok(())
    }
}
