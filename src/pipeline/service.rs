//! Service registry
//!
//! Static deployment parameters for every service this tool knows how to
//! ship. Profiles are looked up once at pipeline start and never mutated.

#![allow(clippy::must_use_candidate)]

use super::errors::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A deployable service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Service {
    /// The lotto guide API with its bundled frontend
    LottoApi,
}

impl Service {
    /// All known services
    pub const ALL: [Self; 1] = [Self::LottoApi];

    /// Name as accepted on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LottoApi => "lotto-api",
        }
    }

    /// Static deployment parameters for this service
    pub fn profile(self) -> &'static ServiceProfile {
        match self {
            Self::LottoApi => &LOTTO_API,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| ServiceError::Unknown {
                name: s.to_string(),
                known: Self::ALL
                    .iter()
                    .map(|service| service.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Immutable deployment parameters of one service.
///
/// Paths are relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProfile {
    /// Compose service name
    pub name: &'static str,
    /// Container name used by the local compose file
    pub container: &'static str,
    /// Port the service listens on inside the container
    pub port: u16,
    /// Host port the local compose file maps to `port`
    pub local_port: u16,
    /// Path of the health endpoint, including the context path
    pub health_path: &'static str,
    /// Glob matching the packaged backend artifact
    pub artifact_glob: &'static str,
    /// Build descriptor for the backend
    pub backend_pom: &'static str,
    /// Frontend project directory
    pub frontend_dir: &'static str,
    /// Build output directory, relative to `frontend_dir`
    pub frontend_dist: &'static str,
    /// Compose file for local deployment
    pub compose_local: &'static str,
    /// Compose file for remote deployment
    pub compose_aws: &'static str,
    /// Remote deploy script
    pub deploy_script: &'static str,
    /// Extra endpoints reported after a healthy local deploy, as (label, path or address)
    pub access_points: &'static [(&'static str, &'static str)],
}

impl ServiceProfile {
    /// Compose file for the selected environment
    pub fn compose_file(&self, local: bool) -> &'static str {
        if local {
            self.compose_local
        } else {
            self.compose_aws
        }
    }

    /// Host to container port mapping of the local deployment, as `host:container`
    pub fn port_mapping(&self) -> String {
        format!("{}:{}", self.local_port, self.port)
    }

    /// Health endpoint of the local deployment
    pub fn local_health_url(&self) -> String {
        format!("http://localhost:{}{}", self.local_port, self.health_path)
    }
}

static LOTTO_API: ServiceProfile = ServiceProfile {
    name: "lotto-api",
    container: "lotto-api-local",
    port: 8080,
    local_port: 8083,
    health_path: "/lotto/actuator/health",
    artifact_glob: "lotto-api/target/lotto-api-*.jar",
    backend_pom: "lotto-api/pom.xml",
    frontend_dir: "client-frontend",
    frontend_dist: "dist",
    compose_local: "docker/docker-compose.local.yml",
    compose_aws: "docker/docker-compose.aws.yml",
    deploy_script: "scripts/deploy-lotto-api-aws.ps1",
    access_points: &[
        ("API", "/lotto/api/v1/"),
        ("Health", "/lotto/actuator/health"),
        ("Frontend", "/lotto/"),
        ("PostgreSQL", "localhost:5434"),
    ],
};
