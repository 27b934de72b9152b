//! Proxy liveness probing

use crate::proxy::ProxyEndpoint;
use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;

/// Decides whether a candidate proxy is usable
#[async_trait]
pub trait ProxyProbe: Send + Sync {
    async fn is_alive(&self, endpoint: &ProxyEndpoint) -> bool;
}

/// Probes a proxy by fetching a known echo endpoint through it
///
/// A proxy is alive when the probe answers 200 within the timeout.
pub struct HttpProbe {
    probe_url: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(probe_url: &str, timeout: Duration) -> Self {
        Self {
            probe_url: probe_url.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl ProxyProbe for HttpProbe {
    async fn is_alive(&self, endpoint: &ProxyEndpoint) -> bool {
        let proxy = match Proxy::all(endpoint.proxy_url()) {
            Ok(proxy) => proxy,
            Err(e) => {
                tracing::debug!("Invalid proxy {}: {}", endpoint, e);
                return false;
            }
        };

        let client = match Client::builder().proxy(proxy).timeout(self.timeout).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::debug!("Failed to build probe client for {}: {}", endpoint, e);
                return false;
            }
        };

        match client.get(&self.probe_url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                tracing::trace!("Proxy {} failed probe: {}", endpoint, e);
                false
            }
        }
    }
}
