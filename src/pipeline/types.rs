//! Core types for pipeline runs
//!
//! This module contains the run state machine and the report produced at
//! the end of a run.

#![allow(clippy::must_use_candidate)]

use super::errors::StageFailure;
use super::service::Service;
use super::stage::{Stage, TargetStage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Outcome of a single stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageResult {
    /// Stage completed successfully
    Success,
    /// Stage failed
    Failure,
}

impl StageResult {
    /// Returns true if result is successful
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if result is a failure
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure)
    }
}

impl fmt::Display for StageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

/// State of a pipeline run
///
/// `NotStarted -> Running(stage) -> Completed | Failed(failure)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    /// No stage has run yet
    NotStarted,
    /// The given stage is executing
    Running(Stage),
    /// Every planned stage succeeded
    Completed,
    /// A stage failed; no further stages ran
    Failed(StageFailure),
}

impl PipelineState {
    /// Returns true once the run has ended, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    /// Returns true if every planned stage succeeded
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Timing and outcome of one executed stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    /// Stage that ran
    pub stage: Stage,
    /// How it ended
    pub result: StageResult,
    /// Wall-clock duration
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Unique id of this invocation
    pub run_id: String,
    /// Service that was shipped
    pub service: Service,
    /// Requested target
    pub target: TargetStage,
    /// True if every planned stage succeeded
    pub success: bool,
    /// True if the run stopped at an intermediate checkpoint
    pub checkpoint: bool,
    /// Stages in execution order
    pub stages: Vec<StageRecord>,
    /// Stage that failed, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    /// Diagnostics of the failing stage
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
    /// Total wall-clock duration
    #[serde(rename = "total_duration_ms", serialize_with = "serialize_millis")]
    pub total_duration: Duration,
}

impl PipelineReport {
    /// Stages that ran, in order
    pub fn executed(&self) -> Vec<Stage> {
        self.stages.iter().map(|record| record.stage).collect()
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_millis<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

/// Trait for types that can be validated
#[allow(clippy::missing_errors_doc)]
pub trait Validate {
    /// Type of validation error
    type Error;

    /// Validates this type
    fn validate(&self) -> std::result::Result<(), Self::Error>;
}
