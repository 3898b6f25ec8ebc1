//! HTTP endpoint probe

use crate::health::{EndpointProbe, ProbeResponse};
use std::time::Duration;

/// Probes health endpoints with a blocking HTTP GET
#[derive(Debug, Clone, Default)]
pub struct HttpProbe {
    client: reqwest::blocking::Client,
}

impl HttpProbe {
    /// Creates a probe with a default client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EndpointProbe for HttpProbe {
    fn probe(&self, url: &str, timeout: Duration) -> ProbeResponse {
        if let Err(e) = url::Url::parse(url) {
            return ProbeResponse::Failed(format!("invalid endpoint '{url}': {e}"));
        }

        match self.client.get(url).timeout(timeout).send() {
            Ok(response) => ProbeResponse::Status(response.status().as_u16()),
            Err(e) if e.is_connect() => ProbeResponse::NotReady(e.to_string()),
            Err(e) => ProbeResponse::Failed(e.to_string()),
        }
    }
}
