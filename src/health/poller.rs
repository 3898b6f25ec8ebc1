//! Health polling loop

use super::{ContainerState, ContainerStatus, EndpointProbe, ProbeResponse};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Bounds and pacing of a health poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Total time budget
    #[serde(rename = "timeout_secs", with = "crate::infrastructure::serde_secs")]
    pub timeout: Duration,
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Pause between attempts
    #[serde(rename = "interval_secs", with = "crate::infrastructure::serde_secs")]
    pub interval: Duration,
    /// Bound of a single network probe
    #[serde(rename = "probe_timeout_secs", with = "crate::infrastructure::serde_secs")]
    pub probe_timeout: Duration,
    /// Report progress every this many attempts (0 disables it)
    pub report_every: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_attempts: 60,
            interval: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(3),
            report_every: 5,
        }
    }
}

/// Terminal result of a health poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The service is up
    Healthy {
        /// Attempt on which the service answered
        attempts: u32,
    },
    /// The attempt or time budget ran out first
    TimedOut {
        /// Attempts made
        attempts: u32,
        /// Time spent polling
        elapsed: Duration,
    },
    /// A non-transient error persisted to the final attempt
    Unretryable(String),
}

impl PollOutcome {
    /// Returns true if the service reported healthy
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy { attempts } => write!(f, "healthy after {attempts} attempt(s)"),
            Self::TimedOut { attempts, elapsed } => write!(
                f,
                "not healthy after {attempts} attempt(s) in {:.1}s",
                elapsed.as_secs_f64()
            ),
            Self::Unretryable(error) => write!(f, "unretryable error: {error}"),
        }
    }
}

enum Check {
    Healthy,
    Waiting(String),
    Failed(String),
}

/// Polls a container (and optionally an endpoint) until it is healthy
#[derive(Debug, Clone)]
pub struct HealthPoller<S, P> {
    status: S,
    probe: P,
    config: PollConfig,
}

impl<S: ContainerStatus, P: EndpointProbe> HealthPoller<S, P> {
    /// Creates a poller
    #[must_use]
    pub fn new(status: S, probe: P, config: PollConfig) -> Self {
        Self {
            status,
            probe,
            config,
        }
    }

    /// Poll bounds in use
    #[must_use]
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Polls until healthy, or until the attempt or time budget is spent.
    ///
    /// Without an `endpoint`, a running container counts as healthy.
    /// Connection errors and unexpected status codes are "not ready yet";
    /// other probe errors are tolerated until the final attempt.
    pub fn poll(&self, container: &str, endpoint: Option<&str>) -> PollOutcome {
        let start = Instant::now();
        let max_attempts = self.config.max_attempts;

        tracing::info!(
            container = %container,
            endpoint = endpoint.unwrap_or("-"),
            timeout_secs = self.config.timeout.as_secs(),
            max_attempts,
            "Waiting for service to become healthy"
        );

        for attempt in 1..=max_attempts {
            if start.elapsed() > self.config.timeout {
                tracing::error!(
                    container = %container,
                    timeout_secs = self.config.timeout.as_secs(),
                    "Health check timed out"
                );
                return PollOutcome::TimedOut {
                    attempts: attempt - 1,
                    elapsed: start.elapsed(),
                };
            }

            let last = attempt == max_attempts;
            let report = self.config.report_every > 0 && attempt % self.config.report_every == 0;

            match self.check(container, endpoint) {
                Check::Healthy => {
                    tracing::info!(container = %container, attempt, "Health check passed");
                    return PollOutcome::Healthy { attempts: attempt };
                }
                Check::Waiting(reason) if report => {
                    tracing::info!(attempt, max_attempts, reason = %reason, "Waiting for health check");
                }
                Check::Waiting(_) => {}
                Check::Failed(error) if last => {
                    tracing::error!(container = %container, error = %error, "Health check failed");
                    return PollOutcome::Unretryable(error);
                }
                Check::Failed(error) if report => {
                    tracing::warn!(attempt, max_attempts, error = %error, "Health check error, retrying");
                }
                Check::Failed(_) => {}
            }

            if !last {
                std::thread::sleep(self.config.interval);
            }
        }

        tracing::error!(container = %container, max_attempts, "Health check exhausted its attempts");
        PollOutcome::TimedOut {
            attempts: max_attempts,
            elapsed: start.elapsed(),
        }
    }

    fn check(&self, container: &str, endpoint: Option<&str>) -> Check {
        match self.status.state(container) {
            Err(e) => Check::Failed(e.to_string()),
            Ok(ContainerState::NotRunning { status }) => {
                Check::Waiting(format!("container not running ({status})"))
            }
            Ok(ContainerState::Running) => match endpoint {
                None => Check::Healthy,
                Some(url) => match self.probe.probe(url, self.config.probe_timeout) {
                    response if response.is_success() => {
                        if response == ProbeResponse::Status(401) {
                            tracing::info!(endpoint = %url, "Endpoint requires authentication, listener is up");
                        }
                        Check::Healthy
                    }
                    ProbeResponse::Status(code) => Check::Waiting(format!("status code {code}")),
                    ProbeResponse::NotReady(reason) => Check::Waiting(reason),
                    ProbeResponse::Failed(error) => Check::Failed(error),
                },
            },
        }
    }
}
