//! Run options and the per-stage timeout policy

use super::errors::ValidationError;
use super::service::Service;
use super::stage::{PlanOptions, Stage, StagePlan, TargetStage};
use super::types::Validate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default command timeouts per stage.
///
/// Long-running builds and the remote deploy get `long`; everything else gets
/// `default`. Container status queries are bounded by `status_query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutPolicy {
    /// Timeout for ordinary commands
    #[serde(rename = "default_secs", with = "crate::infrastructure::serde_secs")]
    pub default: Duration,

    /// Timeout for backend packaging and the remote deploy
    #[serde(rename = "long_secs", with = "crate::infrastructure::serde_secs")]
    pub long: Duration,

    /// Timeout for a single container status query
    #[serde(rename = "status_query_secs", with = "crate::infrastructure::serde_secs")]
    pub status_query: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(300),
            long: Duration::from_secs(1800),
            status_query: Duration::from_secs(5),
        }
    }
}

impl TimeoutPolicy {
    /// Command timeout for steps of `stage`
    #[must_use]
    pub fn for_stage(&self, stage: Stage) -> Duration {
        match stage {
            Stage::BackendBuild | Stage::AwsDeploy => self.long,
            Stage::PrerequisiteCheck
            | Stage::FrontendBuild
            | Stage::ImageBuild
            | Stage::LocalDeploy => self.default,
        }
    }
}

impl Validate for TimeoutPolicy {
    type Error = ValidationError;

    fn validate(&self) -> Result<(), Self::Error> {
        for (field, value) in [
            ("default_secs", self.default),
            ("long_secs", self.long),
            ("status_query_secs", self.status_query),
        ] {
            if value.is_zero() {
                return Err(ValidationError::InvalidTimeout { field, value: 0 });
            }
        }
        Ok(())
    }
}

/// What the operator asked for in one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Service to ship
    pub service: Service,
    /// Requested target stage
    pub target: TargetStage,
    /// Deploy to the local container engine
    pub local: bool,
    /// Leave out the prerequisite check
    pub skip_prerequisites: bool,
    /// Log performance numbers at info level
    pub monitor: bool,
}

impl RunOptions {
    /// Creates options for `service` and `target` with every flag off
    #[must_use]
    pub fn new(service: Service, target: TargetStage) -> Self {
        Self {
            service,
            target,
            local: false,
            skip_prerequisites: false,
            monitor: false,
        }
    }

    /// Resolves the stage plan for these options
    #[must_use]
    pub fn plan(&self) -> StagePlan {
        self.target.plan(PlanOptions {
            local: self.local,
            skip_prerequisites: self.skip_prerequisites,
        })
    }
}
