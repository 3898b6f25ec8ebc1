//! Prelude module for common imports

// Re-export pipeline types with full paths
pub use crate::pipeline::controller::PipelineController;
pub use crate::pipeline::errors::{PipelineError, StageFailure, ValidationError};
pub use crate::pipeline::options::{RunOptions, TimeoutPolicy};
pub use crate::pipeline::service::{Service, ServiceProfile};
pub use crate::pipeline::stage::{PlanOptions, Stage, StagePlan, TargetStage};
pub use crate::pipeline::steps::{ServiceStages, StageActions, StageEnvironment};
pub use crate::pipeline::types::{PipelineReport, PipelineState, StageResult, Validate};

// Re-export executor and health types
pub use crate::executor::{CommandExecutor, CommandRunner, ExecOptions, ExecutionResult, ExecutorConfig};
pub use crate::health::{ContainerStatus, EndpointProbe, HealthPoller, PollConfig, PollOutcome};
