//! Infrastructure layer
//!
//! This module contains external integrations and adapters.

mod artifact;
mod config;
pub mod docker;
mod http;
mod logging;
mod metrics;

pub use artifact::find_latest_artifact;
pub use config::{CONFIG_FILE_NAME, Config, ConfigError};
pub use docker::DockerCli;
pub use http::HttpProbe;
pub use logging::init_logging;
pub use metrics::MetricsCollector;

/// Serde adapter storing a [`std::time::Duration`] as whole seconds
pub(crate) mod serde_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
