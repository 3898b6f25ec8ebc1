//! Post-deploy health checking
//!
//! The [`HealthPoller`] repeatedly asks a [`ContainerStatus`] whether the
//! container is running and, when an endpoint is given, probes it through an
//! [`EndpointProbe`]. Both collaborators are traits so the loop can be driven
//! by the docker CLI and an HTTP client in production and by fakes in tests.

mod poller;

pub use poller::{HealthPoller, PollConfig, PollOutcome};

use std::time::Duration;
use thiserror::Error;

/// Liveness of a container as reported by the container engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    /// The container is up
    Running,
    /// The container is absent, starting or exited
    NotRunning {
        /// Raw status text, empty when the container does not exist
        status: String,
    },
}

/// Result of one network probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResponse {
    /// The endpoint answered with an HTTP status code
    Status(u16),
    /// The listener is not accepting connections yet
    NotReady(String),
    /// Any other probe error
    Failed(String),
}

impl ProbeResponse {
    /// Returns true for the status codes that count as a live service.
    ///
    /// 401 means the listener is up and enforcing authentication.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Status(200 | 401))
    }
}

/// A container status query that could not be answered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("container status query failed: {0}")]
pub struct StatusError(pub String);

/// Queries container liveness by name
pub trait ContainerStatus {
    /// Returns the current state of `container`
    ///
    /// # Errors
    ///
    /// Returns [`StatusError`] if the container engine could not be queried.
    fn state(&self, container: &str) -> Result<ContainerState, StatusError>;
}

/// Issues a bounded network probe against an endpoint
pub trait EndpointProbe {
    /// Probes `url`, giving up after `timeout`
    fn probe(&self, url: &str, timeout: Duration) -> ProbeResponse;
}

impl<T: ContainerStatus + ?Sized> ContainerStatus for &T {
    fn state(&self, container: &str) -> Result<ContainerState, StatusError> {
        (**self).state(container)
    }
}

impl<T: EndpointProbe + ?Sized> EndpointProbe for &T {
    fn probe(&self, url: &str, timeout: Duration) -> ProbeResponse {
        (**self).probe(url, timeout)
    }
}
