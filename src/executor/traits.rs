//! Command execution traits
//!
//! Stage actions and the container status query depend on [`CommandRunner`]
//! rather than on a concrete process spawner, so external tools can be
//! replaced in tests.

use super::command::{ExecOptions, ExecutionResult};

/// Runs one external command to completion
pub trait CommandRunner {
    /// Executes `command` and classifies its outcome.
    ///
    /// Implementations never retry: a failed command is reported once.
    fn execute(&self, command: &str, options: &ExecOptions) -> ExecutionResult;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn execute(&self, command: &str, options: &ExecOptions) -> ExecutionResult {
        (**self).execute(command, options)
    }
}
