//! Docker CLI adapter
//!
//! Builds compose command lines and answers container status and log queries
//! through a [`CommandRunner`].

use crate::executor::{CommandRunner, ExecOptions};
use crate::health::{ContainerState, ContainerStatus, StatusError};
use std::path::Path;
use std::time::Duration;

/// Builds a `docker compose -f <file> <args>` command line
#[must_use]
pub fn compose_command(file: &Path, args: &[&str]) -> String {
    let file = file.to_string_lossy();
    let mut parts = vec![
        "docker".to_string(),
        "compose".to_string(),
        "-f".to_string(),
        shell_words::quote(&file).into_owned(),
    ];
    parts.extend(args.iter().map(|arg| shell_words::quote(arg).into_owned()));
    parts.join(" ")
}

/// Container queries through the docker CLI
#[derive(Debug, Clone)]
pub struct DockerCli<R> {
    runner: R,
    query_timeout: Duration,
}

impl<R: CommandRunner> DockerCli<R> {
    /// Creates an adapter bounding each query by `query_timeout`
    #[must_use]
    pub fn new(runner: R, query_timeout: Duration) -> Self {
        Self {
            runner,
            query_timeout,
        }
    }

    /// Returns the last `lines` lines of container output.
    ///
    /// Runs in soft-fail mode; a failed query yields the warnings instead.
    pub fn tail_logs(&self, container: &str, lines: u32) -> Vec<String> {
        let command = format!(
            "docker logs --tail={lines} {}",
            shell_words::quote(container)
        );
        let result = self.runner.execute(
            &command,
            &ExecOptions::new()
                .ignore_errors(true)
                .timeout(self.query_timeout),
        );

        if !result.warnings().is_empty() || !result.errors().is_empty() {
            return result
                .errors()
                .iter()
                .chain(result.warnings())
                .cloned()
                .collect();
        }

        result
            .stdout()
            .lines()
            .chain(result.stderr().lines())
            .map(str::to_string)
            .collect()
    }
}

impl<R: CommandRunner> ContainerStatus for DockerCli<R> {
    fn state(&self, container: &str) -> Result<ContainerState, StatusError> {
        let command = format!(
            "docker ps --filter {} --format {}",
            shell_words::quote(&format!("name={container}")),
            shell_words::quote("{{.Status}}")
        );
        let result = self
            .runner
            .execute(&command, &ExecOptions::new().timeout(self.query_timeout).quiet(true));

        if !result.succeeded() {
            return Err(StatusError(result.errors().join("; ")));
        }

        let status = result.stdout().trim();
        if status.lines().any(|line| line.trim_start().starts_with("Up")) {
            Ok(ContainerState::Running)
        } else {
            Ok(ContainerState::NotRunning {
                status: status.to_string(),
            })
        }
    }
}
