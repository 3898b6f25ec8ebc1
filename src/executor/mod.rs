//! Command execution layer
//!
//! This module contains the bounded external-process executor and the
//! working-directory handle it runs in.

mod command;
mod traits;
mod workdir;

pub use command::{CommandExecutor, ExecOptions, ExecutionMetrics, ExecutionResult, ExecutorConfig};
pub use traits::CommandRunner;
pub use workdir::WorkingContext;
