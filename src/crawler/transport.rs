//! HTTP transport through a proxy
//!
//! The fetcher only needs "GET this URL through this proxy"; this module
//! provides that over reqwest, with one client per proxy endpoint.

use crate::config::FetcherConfig;
use crate::proxy::ProxyEndpoint;
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Status and body of a completed request
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Request failures that produced no HTTP status
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timeout")]
    Timeout,

    /// The proxy itself refused or dropped the connection
    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Proxy(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, proxy: &ProxyEndpoint) -> Result<RawResponse, TransportError>;
}

/// Builds an HTTP client that routes every request through `proxy`
///
/// # Example
///
/// ```no_run
/// use olympedia_harvest::config::FetcherConfig;
/// use olympedia_harvest::crawler::build_http_client;
/// use olympedia_harvest::proxy::ProxyEndpoint;
///
/// let proxy = ProxyEndpoint::new("10.0.0.1:8080", "user", "pass");
/// let client = build_http_client(&FetcherConfig::default(), &proxy).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig, proxy: &ProxyEndpoint) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .proxy(Proxy::all(proxy.proxy_url())?)
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed transport with a client cache keyed by proxy address
pub struct ReqwestTransport {
    config: FetcherConfig,
    clients: Mutex<HashMap<ProxyEndpoint, Client>>,
}

impl ReqwestTransport {
    pub fn new(config: FetcherConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, proxy: &ProxyEndpoint) -> Result<Client, TransportError> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(proxy) {
            return Ok(client.clone());
        }
        let client = build_http_client(&self.config, proxy)
            .map_err(|e| TransportError::Proxy(format!("invalid proxy {}: {}", proxy, e)))?;
        clients.insert(proxy.clone(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, proxy: &ProxyEndpoint) -> Result<RawResponse, TransportError> {
        let client = self.client_for(proxy)?;
        let response = client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(RawResponse::new(status, body.to_vec()))
    }
}
