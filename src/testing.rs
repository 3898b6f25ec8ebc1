//! Test doubles shared by unit tests

use crate::executor::{CommandRunner, ExecOptions, ExecutionResult};
use std::cell::RefCell;
use std::time::Duration;

/// Records every command and answers from substring rules.
///
/// The first rule whose pattern occurs in the command wins; commands with no
/// matching rule exit 0 with empty output.
#[derive(Default)]
pub struct RecordingRunner {
    rules: Vec<(String, Response)>,
    calls: RefCell<Vec<(String, ExecOptions)>>,
}

#[derive(Clone)]
enum Response {
    Exit { code: i32, stdout: String, stderr: String },
    Timeout,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, pattern: &str, code: i32, stdout: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            Response::Exit {
                code,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        ));
        self
    }

    pub fn fail(mut self, pattern: &str, stderr: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            Response::Exit {
                code: 1,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        ));
        self
    }

    pub fn time_out(mut self, pattern: &str) -> Self {
        self.rules.push((pattern.to_string(), Response::Timeout));
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(command, _)| command.clone()).collect()
    }

    pub fn options_for(&self, pattern: &str) -> Option<ExecOptions> {
        self.calls
            .borrow()
            .iter()
            .find(|(command, _)| command.contains(pattern))
            .map(|(_, options)| options.clone())
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.calls.borrow().iter().any(|(command, _)| command.contains(pattern))
    }
}

impl CommandRunner for RecordingRunner {
    fn execute(&self, command: &str, options: &ExecOptions) -> ExecutionResult {
        self.calls
            .borrow_mut()
            .push((command.to_string(), options.clone()));

        let response = self
            .rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());

        match response {
            Some(Response::Timeout) => {
                let timeout = options.timeout.unwrap_or(Duration::from_secs(300));
                ExecutionResult::timed_out(timeout, timeout)
            }
            Some(Response::Exit {
                code,
                stdout,
                stderr,
            }) => ExecutionResult::from_exit(code, stdout, stderr, Duration::ZERO, options.ignore_errors),
            None => ExecutionResult::from_exit(0, String::new(), String::new(), Duration::ZERO, options.ignore_errors),
        }
    }
}

/// Container status that always reports the same state
pub struct FixedStatus(pub crate::health::ContainerState);

impl crate::health::ContainerStatus for FixedStatus {
    fn state(&self, _container: &str) -> Result<crate::health::ContainerState, crate::health::StatusError> {
        Ok(self.0.clone())
    }
}

/// Endpoint probe that always returns the same response
pub struct FixedProbe(pub crate::health::ProbeResponse);

impl crate::health::EndpointProbe for FixedProbe {
    fn probe(&self, _url: &str, _timeout: Duration) -> crate::health::ProbeResponse {
        self.0.clone()
    }
}

/// Counts info-level events emitted on this thread while `f` runs
pub fn count_info_events<T>(f: impl FnOnce() -> T) -> (T, usize) {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    struct InfoCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for InfoCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::INFO {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    let count = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(InfoCounter(Arc::clone(&count)));
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, count.load(Ordering::SeqCst))
}
