//! Olympedia-Harvest: a proxied, resumable results-site crawler
//!
//! This crate crawls a sports-results website in stages (countries → events →
//! athletes), scrapes structured records from the final URL set, and writes
//! them to flat files that later runs use as checkpoints.

pub mod config;
pub mod crawler;
pub mod output;
pub mod pipeline;
pub mod proxy;
pub mod site;

use thiserror::Error;

/// Main error type for Olympedia-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Proxy error: {0}")]
    Proxy(#[from] ProxyError),

    #[error("Artifact store error: {0}")]
    Store(#[from] output::StoreError),

    #[error("Missing input artifact: {0}")]
    MissingInput(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Proxy pool errors
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    #[error("No proxies available after validation")]
    NoProxiesAvailable,

    #[error("Proxy source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Malformed proxy line: {0}")]
    MalformedLine(String),
}

/// Result type alias for Olympedia-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{FetchResult, Fetcher};
pub use pipeline::{Pipeline, PipelineReport, Stage, StatusHandle};
pub use proxy::{ProxyEndpoint, ProxyPool};
