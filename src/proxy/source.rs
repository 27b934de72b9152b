//! Raw proxy list loading
//!
//! The list is a plain text file of `ip:port:username:password` lines, either
//! downloaded from a URL or read from disk.

use crate::config::ProxyConfig;
use crate::proxy::ProxyEndpoint;
use crate::ProxyError;
use reqwest::Client;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Where the raw proxy list comes from
#[derive(Debug, Clone)]
pub enum ProxySource {
    /// Downloaded over HTTP, retried on failure
    Url {
        url: String,
        retries: u32,
        retry_delay: Duration,
    },

    /// Read from a local file
    File(PathBuf),

    /// Supplied directly
    Lines(Vec<String>),
}

impl ProxySource {
    /// Picks a URL or file source based on the configured string
    pub fn from_config(config: &ProxyConfig) -> Self {
        let source = config.source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            ProxySource::Url {
                url: source.to_string(),
                retries: config.source_retries.max(1),
                retry_delay: Duration::from_secs(config.source_retry_delay_secs),
            }
        } else {
            ProxySource::File(PathBuf::from(source))
        }
    }

    /// Loads the raw list and parses it into unique candidate endpoints
    ///
    /// Malformed lines are logged and skipped. An unreachable source is an
    /// error; an empty list is not (validation reports that case).
    pub async fn load_candidates(&self) -> Result<Vec<ProxyEndpoint>, ProxyError> {
        let text = match self {
            ProxySource::Url {
                url,
                retries,
                retry_delay,
            } => download(url, *retries, *retry_delay).await?,
            ProxySource::File(path) => tokio::fs::read_to_string(path).await.map_err(|e| {
                ProxyError::SourceUnavailable(format!("{}: {}", path.display(), e))
            })?,
            ProxySource::Lines(lines) => lines.join("\n"),
        };

        Ok(parse_candidates(&text))
    }
}

/// Parses proxy lines, dropping blanks, duplicates and malformed entries
pub fn parse_candidates(text: &str) -> Vec<ProxyEndpoint> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !seen.insert(line) {
            continue;
        }
        match ProxyEndpoint::parse(line) {
            Ok(endpoint) => candidates.push(endpoint),
            Err(e) => tracing::warn!("Skipping proxy entry: {}", e),
        }
    }

    candidates
}

async fn download(url: &str, retries: u32, retry_delay: Duration) -> Result<String, ProxyError> {
    let client = Client::new();
    let mut last_error = String::new();

    for attempt in 1..=retries {
        let result = match client.get(url).send().await {
            Ok(response) => match response.error_for_status() {
                Ok(response) => response.text().await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => return Ok(text),
            Err(e) => {
                last_error = e.to_string();
                tracing::warn!(
                    "Failed to download proxies (attempt {}/{}): {}",
                    attempt,
                    retries,
                    e
                );
                if attempt < retries {
                    tokio::time::sleep(retry_delay).await;
                }
            }
        }
    }

    Err(ProxyError::SourceUnavailable(format!(
        "{}: {}",
        url, last_error
    )))
}
