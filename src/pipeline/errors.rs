//! Error types for the deployment pipeline

use super::stage::{Stage, TargetStage};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a pipeline run.
///
/// Every variant carries enough context to print diagnostics for the
/// operator; see [`PipelineError::diagnostics`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A required tool is missing or unusable
    #[error("Prerequisite check failed: {}", missing.join(", "))]
    Prerequisite {
        /// Tools that could not be found or reported an error.
        missing: Vec<String>,
        /// Captured error entries from the failed checks.
        details: Vec<String>,
    },

    /// An external tool exited with a non-zero status
    #[error("Command `{command}` failed")]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Error entries recorded by the executor.
        errors: Vec<String>,
    },

    /// A command or health probe exceeded its bound
    #[error("`{operation}` timed out")]
    Timeout {
        /// The command line or probe target.
        operation: String,
        /// Error entries recorded by the executor or poller.
        errors: Vec<String>,
    },

    /// The service never reported a healthy status
    #[error("Health check for '{container}' failed: {reason}")]
    HealthCheck {
        /// Container that was polled.
        container: String,
        /// Why the poll ended.
        reason: String,
        /// Recent container output collected after the failure.
        logs: Vec<String>,
    },

    /// A file or directory the stage depends on is absent
    #[error("{what} not found: {}", path.display())]
    MissingPath {
        /// Human readable description of the path.
        what: String,
        /// The path that was checked.
        path: PathBuf,
    },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl PipelineError {
    /// Returns the diagnostic lines the operator should see for this failure.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        let mut lines = vec![self.to_string()];
        match self {
            Self::Prerequisite { details, .. } => lines.extend(details.iter().cloned()),
            Self::CommandFailed { errors, .. } | Self::Timeout { errors, .. } => {
                lines.extend(errors.iter().cloned());
            }
            Self::HealthCheck { logs, .. } => lines.extend(logs.iter().cloned()),
            Self::MissingPath { .. } | Self::Io(_) => {}
        }
        lines
    }

    /// Returns true if this failure was caused by an expired bound
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A failure pinned to the stage that produced it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Stage '{stage}' failed: {error}")]
pub struct StageFailure {
    /// Stage that failed.
    pub stage: Stage,
    /// Underlying error.
    pub error: PipelineError,
}

/// Errors resolving a service name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The name does not match any known service
    #[error("Unknown service '{name}' (known: {known})")]
    Unknown {
        /// Requested name.
        name: String,
        /// Comma separated list of known services.
        known: String,
    },
}

/// Errors parsing a requested target stage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown stage '{0}' (known: {})", TargetStage::ALL.map(TargetStage::as_str).join(", "))]
pub struct UnknownStage(pub String);

/// Validation errors for run settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid timeout value
    #[error("Invalid timeout '{field}': must be positive, got {value}")]
    InvalidTimeout {
        /// Setting that holds the timeout.
        field: &'static str,
        /// The invalid timeout value in seconds.
        value: u64,
    },

    /// Invalid attempt budget
    #[error("Invalid attempt count: must be positive, got {value}")]
    InvalidAttempts {
        /// The invalid attempt count.
        value: u32,
    },

    /// Log level filter could not be parsed
    #[error("Invalid log level: '{0}'")]
    InvalidLogLevel(String),
}
