//! Pipeline domain types and logic
//!
//! A requested [`TargetStage`] resolves into a [`StagePlan`]; the
//! [`PipelineController`] walks that plan, handing each [`Stage`] to a
//! [`StageActions`] implementation, and ends with a [`PipelineReport`].

pub mod controller;
pub mod errors;
pub mod options;
pub mod service;
pub mod stage;
pub mod steps;
pub mod types;


pub use controller::PipelineController;
pub use errors::{PipelineError, ServiceError, StageFailure, UnknownStage, ValidationError};
pub use options::{RunOptions, TimeoutPolicy};
pub use service::{Service, ServiceProfile};
pub use stage::{PlanOptions, Stage, StagePlan, TargetStage};
pub use steps::{ServiceStages, StageActions, StageEnvironment};
pub use types::{PipelineReport, PipelineState, StageRecord, StageResult, Validate};
