//! Bounded external command execution
//!
//! [`CommandExecutor`] runs one shell command to completion, enforcing a
//! timeout, capturing stdout and stderr as text and classifying the outcome
//! into an [`ExecutionResult`]:
//!
//! - exit status 0 is a success
//! - a non-zero exit is a failure with the exit code and stderr recorded as
//!   errors, unless the caller asked for soft-fail mode, in which case it is a
//!   success with the failure recorded as a warning
//! - an expired timeout is always a failure with exactly one timeout error,
//!   soft-fail or not
//!
//! ```rust,no_run
//! use shipline::{CommandExecutor, CommandRunner, ExecOptions};
//! use std::time::Duration;
//!
//! let executor = CommandExecutor::new();
//! let result = executor.execute(
//!     "docker compose -f docker/docker-compose.local.yml down",
//!     &ExecOptions::new().ignore_errors(true).timeout(Duration::from_secs(60)),
//! );
//! assert!(result.succeeded());
//! ```

use super::traits::CommandRunner;
use super::workdir::WorkingContext;
use crate::pipeline::PipelineError;
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Configuration for the command executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Directory commands run in unless a call overrides it
    pub cwd: PathBuf,

    /// Shell used to interpret command lines (default: sh)
    pub shell: String,

    /// Flag passing the command line to the shell (default: -c)
    pub shell_flag: String,

    /// Timeout applied when a call does not set one
    pub default_timeout: Duration,

    /// How often a running child is checked for exit or expiry
    pub poll_interval: Duration,

    /// Log performance numbers at info level instead of debug
    pub monitor: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let (shell, shell_flag) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        Self {
            cwd: std::env::current_dir().unwrap_or_default(),
            shell: shell.to_string(),
            shell_flag: shell_flag.to_string(),
            default_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(50),
            monitor: false,
        }
    }
}

/// Per-call execution options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Maximum run time; the executor default applies when unset
    pub timeout: Option<Duration>,

    /// Record a non-zero exit as a warning instead of an error
    pub ignore_errors: bool,

    /// Directory to run in; the executor's directory applies when unset
    pub cwd: Option<PathBuf>,

    /// Log the start and success of the command at debug level only
    pub quiet: bool,
}

impl ExecOptions {
    /// Creates default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enables or disables soft-fail mode
    #[must_use]
    pub fn ignore_errors(mut self, ignore: bool) -> Self {
        self.ignore_errors = ignore;
        self
    }

    /// Keeps routine lines of repeated queries out of the info log
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Runs the command inside the given working context
    #[must_use]
    pub fn within(mut self, context: &WorkingContext) -> Self {
        self.cwd = Some(context.path().to_path_buf());
        self
    }
}

/// Performance numbers of one command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionMetrics {
    /// Wall-clock duration
    pub duration: Duration,

    /// Exit code, if the command exited on its own
    pub exit_code: Option<i32>,

    /// Number of stdout lines
    pub stdout_lines: usize,

    /// Number of stderr lines
    pub stderr_lines: usize,
}

/// Outcome of one command. Built once by the executor and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    succeeded: bool,
    timed_out: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
    metrics: ExecutionMetrics,
    stdout: String,
    stderr: String,
}

impl ExecutionResult {
    /// Classifies a command that exited on its own
    #[must_use]
    pub fn from_exit(
        exit_code: i32,
        stdout: String,
        stderr: String,
        duration: Duration,
        ignore_errors: bool,
    ) -> Self {
        let metrics = ExecutionMetrics {
            duration,
            exit_code: Some(exit_code),
            stdout_lines: stdout.lines().count(),
            stderr_lines: stderr.lines().count(),
        };

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let stderr_entry = (!stderr.trim().is_empty()).then(|| format!("stderr: {}", stderr.trim()));

        let succeeded = if exit_code == 0 {
            true
        } else if ignore_errors {
            warnings.push(format!(
                "command failed (ignored): exit code {exit_code}"
            ));
            warnings.extend(stderr_entry);
            true
        } else {
            errors.push(format!("command failed with exit code {exit_code}"));
            errors.extend(stderr_entry);
            false
        };

        Self {
            succeeded,
            timed_out: false,
            errors,
            warnings,
            metrics,
            stdout,
            stderr,
        }
    }

    /// A command killed after exceeding `timeout`
    #[must_use]
    pub fn timed_out(timeout: Duration, elapsed: Duration) -> Self {
        let secs = timeout.as_secs();
        Self {
            succeeded: false,
            timed_out: true,
            errors: vec![format!(
                "command timed out after {} min ({secs}s)",
                secs / 60
            )],
            warnings: Vec::new(),
            metrics: ExecutionMetrics {
                duration: elapsed,
                ..ExecutionMetrics::default()
            },
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// A command that could not be started or waited on
    #[must_use]
    pub fn launch_failed(error: &std::io::Error, elapsed: Duration) -> Self {
        Self {
            succeeded: false,
            timed_out: false,
            errors: vec![format!("failed to run command: {error}")],
            warnings: Vec::new(),
            metrics: ExecutionMetrics {
                duration: elapsed,
                ..ExecutionMetrics::default()
            },
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Returns true if the command succeeded (or soft-failed)
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Returns true if the command was killed by its timeout
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.timed_out
    }

    /// Error entries, in order
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Warning entries, in order
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Performance numbers
    #[must_use]
    pub fn metrics(&self) -> &ExecutionMetrics {
        &self.metrics
    }

    /// Captured standard output
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Captured standard error
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Converts a failed result into the matching pipeline error
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Timeout`] or [`PipelineError::CommandFailed`]
    /// when the command did not succeed.
    pub fn into_result(self, command: &str) -> Result<Self, PipelineError> {
        if self.succeeded {
            return Ok(self);
        }
        if self.timed_out {
            return Err(PipelineError::Timeout {
                operation: command.to_string(),
                errors: self.errors,
            });
        }
        Err(PipelineError::CommandFailed {
            command: command.to_string(),
            errors: self.errors,
        })
    }
}

/// Runs commands through the system shell
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    /// Creates an executor with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor from an explicit configuration
    #[must_use]
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Sets the directory commands run in
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.config.cwd = cwd.into();
        self
    }

    /// Sets the timeout used when a call does not set one
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Enables performance logging
    #[must_use]
    pub fn with_monitor(mut self, monitor: bool) -> Self {
        self.config.monitor = monitor;
        self
    }

    /// Executor configuration
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn run(&self, command: &str, options: &ExecOptions) -> ExecutionResult {
        let timeout = options.timeout.unwrap_or(self.config.default_timeout);
        let cwd = options.cwd.as_ref().unwrap_or(&self.config.cwd);

        if options.quiet {
            tracing::debug!(command = %command, cwd = %cwd.display(), timeout_secs = timeout.as_secs(), "Executing command");
        } else {
            tracing::info!(command = %command, cwd = %cwd.display(), timeout_secs = timeout.as_secs(), "Executing command");
        }

        let start = Instant::now();
        let mut cmd = Command::new(&self.config.shell);
        cmd.arg(&self.config.shell_flag);
        cmd.arg(command);
        cmd.current_dir(cwd);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Own process group, so a timeout can reach everything the shell forks
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(command = %command, error = %e, "Failed to start command");
                return ExecutionResult::launch_failed(&e, start.elapsed());
            }
        };

        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if start.elapsed() >= timeout => {
                    // Readers are left detached: a grandchild may still hold the pipes.
                    kill_tree(&mut child);
                    let _ = child.wait();
                    let result = ExecutionResult::timed_out(timeout, start.elapsed());
                    tracing::error!(command = %command, error = %result.errors()[0], "Command timed out");
                    return result;
                }
                Ok(None) => std::thread::sleep(self.config.poll_interval),
                Err(e) => {
                    kill_tree(&mut child);
                    tracing::error!(command = %command, error = %e, "Failed to wait for command");
                    return ExecutionResult::launch_failed(&e, start.elapsed());
                }
            }
        };

        let stdout = join_reader(stdout_reader);
        let stderr = join_reader(stderr_reader);
        let exit_code = status.code().unwrap_or(-1);

        let result = ExecutionResult::from_exit(
            exit_code,
            stdout,
            stderr,
            start.elapsed(),
            options.ignore_errors,
        );
        self.log_outcome(command, &result, options.quiet);
        result
    }

    fn log_outcome(&self, command: &str, result: &ExecutionResult, quiet: bool) {
        let metrics = result.metrics();

        if !result.errors().is_empty() {
            if !result.stdout().is_empty() {
                tracing::error!(command = %command, stdout = %result.stdout().trim_end(), "Command output");
            }
            tracing::error!(
                command = %command,
                exit_code = ?metrics.exit_code,
                errors = ?result.errors(),
                "Command failed"
            );
            return;
        }

        if !result.warnings().is_empty() {
            tracing::warn!(
                command = %command,
                exit_code = ?metrics.exit_code,
                warnings = ?result.warnings(),
                "Command failed, ignored"
            );
            return;
        }

        if self.config.monitor && !quiet {
            tracing::info!(
                command = %command,
                duration_ms = metrics.duration.as_millis(),
                stdout_lines = metrics.stdout_lines,
                stderr_lines = metrics.stderr_lines,
                "Command performance"
            );
        } else {
            tracing::debug!(
                command = %command,
                duration_ms = metrics.duration.as_millis(),
                stdout_lines = metrics.stdout_lines,
                "Command performance"
            );
        }
        if quiet {
            tracing::debug!(command = %command, "Command succeeded");
        } else {
            tracing::info!(command = %command, "Command succeeded");
        }
    }
}

impl CommandRunner for CommandExecutor {
    fn execute(&self, command: &str, options: &ExecOptions) -> ExecutionResult {
        self.run(command, options)
    }
}

/// Kills the child and, on unix, every process left in its group
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: killpg only sends a signal; the group was created for this child.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
}

fn spawn_reader<R>(pipe: Option<R>) -> Option<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(reader: Option<JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}
