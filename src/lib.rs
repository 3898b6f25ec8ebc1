//! # Shipline - build and deployment orchestration
//!
//! Shipline drives the external toolchain (npm, Maven, Docker, PowerShell)
//! through a fixed sequence of stages to build and ship a service, either to
//! the local container engine or to a remote environment via a deploy script.
//!
//! ## Features
//!
//! - **Bounded commands**: every external tool runs with a timeout and its
//!   outcome is classified as success, failure, soft failure or timeout
//! - **Health polling**: local deployments are polled until the service
//!   answers or the attempt and time budgets run out
//! - **Stage pipeline**: targets resolve to an ordered stage list that stops
//!   at the first failure and reports which stage failed
//!
//! ## Example
//!
//! ```rust,no_run
//! use shipline::{Config, RunOptions, Service, TargetStage, run_pipeline};
//!
//! let options = RunOptions::new(Service::LottoApi, TargetStage::FrontendBuild);
//! let (_state, report) = run_pipeline(&Config::default(), options);
//! println!("success: {}", report.success);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod deploy;
pub mod executor;
pub mod health;
pub mod infrastructure;
pub mod pipeline;

// Prelude module for common imports
pub mod prelude;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use deploy::run_pipeline;
pub use executor::{CommandExecutor, CommandRunner, ExecOptions, ExecutionResult, WorkingContext};
pub use health::{HealthPoller, PollConfig, PollOutcome};
pub use infrastructure::{Config, ConfigError, MetricsCollector, init_logging};
pub use pipeline::{
    PipelineController, PipelineError, PipelineReport, PipelineState, RunOptions, Service, Stage,
    StageResult, TargetStage, Validate,
};

/// Version of the shipline crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
