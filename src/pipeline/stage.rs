//! Stage identities and target-stage resolution
//!
//! A [`Stage`] is one step of the fixed deployment order. A [`TargetStage`] is
//! what the operator asks for on the command line; [`TargetStage::plan`]
//! turns it into the ordered subset of stages that actually run.

#![allow(clippy::must_use_candidate)]

use super::errors::UnknownStage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stage of the deployment pipeline, in declared execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Verify the required tools are installed
    PrerequisiteCheck,
    /// Install dependencies and build the static frontend assets
    FrontendBuild,
    /// Compile and package the backend artifact
    BackendBuild,
    /// Build the container image
    ImageBuild,
    /// Recreate the local compose deployment and wait for it to be healthy
    LocalDeploy,
    /// Run the remote deploy script
    AwsDeploy,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Self; 6] = [
        Self::PrerequisiteCheck,
        Self::FrontendBuild,
        Self::BackendBuild,
        Self::ImageBuild,
        Self::LocalDeploy,
        Self::AwsDeploy,
    ];

    /// Kebab-case name used in logs and reports
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PrerequisiteCheck => "prerequisite-check",
            Self::FrontendBuild => "frontend-build",
            Self::BackendBuild => "backend-build",
            Self::ImageBuild => "image-build",
            Self::LocalDeploy => "local-deploy",
            Self::AwsDeploy => "aws-deploy",
        }
    }

    /// Returns true for stages that put a service in front of traffic
    pub fn is_deploy(self) -> bool {
        matches!(self, Self::LocalDeploy | Self::AwsDeploy)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stage requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetStage {
    /// Frontend and backend builds
    Build,
    /// Image build and local deployment
    Deploy,
    /// Stop after the frontend build
    FrontendBuild,
    /// Stop after the backend build
    BackendBuild,
    /// Image build only
    DockerRebuild,
    /// Prerequisite check only
    Verify,
    /// Full local chain
    All,
    /// Full build chain plus the remote deploy
    AwsDeploy,
}

impl TargetStage {
    /// All accepted targets
    pub const ALL: [Self; 8] = [
        Self::Build,
        Self::Deploy,
        Self::FrontendBuild,
        Self::BackendBuild,
        Self::DockerRebuild,
        Self::Verify,
        Self::All,
        Self::AwsDeploy,
    ];

    /// Kebab-case name as accepted on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Deploy => "deploy",
            Self::FrontendBuild => "frontend-build",
            Self::BackendBuild => "backend-build",
            Self::DockerRebuild => "docker-rebuild",
            Self::Verify => "verify",
            Self::All => "all",
            Self::AwsDeploy => "aws-deploy",
        }
    }

    /// Returns true if this target names an intermediate checkpoint.
    ///
    /// A checkpoint run reports success right after its last stage even
    /// though later stages exist in the full order.
    pub fn is_checkpoint(self) -> bool {
        matches!(self, Self::FrontendBuild | Self::BackendBuild)
    }

    /// Static membership table: does this target run `stage`?
    ///
    /// Backend packaging assumes the frontend assets exist, so every target
    /// that builds the backend also builds the frontend.
    fn includes(self, stage: Stage, local: bool) -> bool {
        use Stage as S;
        use TargetStage as T;

        match stage {
            S::PrerequisiteCheck => true,
            S::FrontendBuild => matches!(
                self,
                T::Build | T::FrontendBuild | T::BackendBuild | T::All | T::AwsDeploy
            ),
            S::BackendBuild => matches!(self, T::Build | T::BackendBuild | T::All | T::AwsDeploy),
            S::ImageBuild => matches!(self, T::DockerRebuild | T::Deploy | T::All | T::AwsDeploy),
            S::LocalDeploy => local && matches!(self, T::Deploy | T::All),
            S::AwsDeploy => self == T::AwsDeploy,
        }
    }

    /// Resolves this target into the ordered list of stages to execute
    pub fn plan(self, options: PlanOptions) -> StagePlan {
        let stages = Stage::ALL
            .into_iter()
            .filter(|stage| self.includes(*stage, options.local))
            .filter(|stage| !(options.skip_prerequisites && *stage == Stage::PrerequisiteCheck))
            .collect();

        let mut notices = Vec::new();
        if matches!(self, Self::Deploy | Self::All) && !options.local {
            notices.push(
                "No deployment target selected; pass --local or use --stage aws-deploy".to_string(),
            );
        }

        StagePlan {
            target: self,
            stages,
            notices,
        }
    }
}

impl fmt::Display for TargetStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetStage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|target| target.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Flags that influence plan resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Deploy to the local container engine
    pub local: bool,
    /// Leave out the prerequisite check
    pub skip_prerequisites: bool,
}

/// Ordered stages resolved from a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    target: TargetStage,
    stages: Vec<Stage>,
    notices: Vec<String>,
}

impl StagePlan {
    /// Target this plan was resolved from
    pub fn target(&self) -> TargetStage {
        self.target
    }

    /// Stages to run, in order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns true if `stage` is part of this plan
    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    /// Operator notices produced while resolving the plan
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Returns true if the plan stops at an intermediate checkpoint
    pub fn is_checkpoint(&self) -> bool {
        self.target.is_checkpoint()
    }
}
