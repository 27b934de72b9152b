use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Olympedia-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root of the results site; every stage URL is built from it
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Worker counts per crawl stage
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    #[serde(rename = "country-workers", default = "default_country_workers")]
    pub country_workers: usize,

    #[serde(rename = "event-workers", default = "default_link_workers")]
    pub event_workers: usize,

    #[serde(rename = "athlete-workers", default = "default_link_workers")]
    pub athlete_workers: usize,

    #[serde(rename = "scrape-workers", default = "default_scrape_workers")]
    pub scrape_workers: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            country_workers: default_country_workers(),
            event_workers: default_link_workers(),
            athlete_workers: default_link_workers(),
            scrape_workers: default_scrape_workers(),
        }
    }
}

/// Retry and timeout behaviour of the page fetcher
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Retryable failures tolerated before a URL is given up
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, in seconds
    #[serde(rename = "retry-delay-secs", default = "default_retry_delay")]
    pub retry_delay_secs: f64,

    /// Multiplier applied to the delay after every retry
    #[serde(rename = "backoff-factor", default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Ceiling for a single backoff wait, in seconds
    #[serde(rename = "max-wait-secs", default = "default_max_wait")]
    pub max_wait_secs: f64,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            backoff_factor: default_backoff_factor(),
            max_wait_secs: default_max_wait(),
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetcherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Proxy list location and liveness probe settings
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// URL or local file holding `ip:port:username:password` lines
    pub source: String,

    #[serde(rename = "probe-url", default = "default_probe_url")]
    pub probe_url: String,

    #[serde(rename = "probe-timeout-secs", default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Candidates validated concurrently during a (re)load
    #[serde(rename = "validate-workers", default = "default_validate_workers")]
    pub validate_workers: usize,

    #[serde(rename = "source-retries", default = "default_source_retries")]
    pub source_retries: u32,

    #[serde(rename = "source-retry-delay-secs", default = "default_source_retry_delay")]
    pub source_retry_delay_secs: u64,
}

/// Output locations
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory for intermediate URL lists and raw scrape dumps
    #[serde(rename = "raw-data-dir", default = "default_raw_data_dir")]
    pub raw_data_dir: String,

    /// Directory for the tabular datasets
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            raw_data_dir: default_raw_data_dir(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.olympedia.org".to_string()
}

fn default_country_workers() -> usize {
    10
}

fn default_link_workers() -> usize {
    100
}

fn default_scrape_workers() -> usize {
    50
}

fn default_max_retries() -> u32 {
    30
}

fn default_retry_delay() -> f64 {
    5.0
}

fn default_backoff_factor() -> f64 {
    1.5
}

fn default_max_wait() -> f64 {
    60.0
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("olympedia-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_probe_url() -> String {
    "http://icanhazip.com".to_string()
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_validate_workers() -> usize {
    20
}

fn default_source_retries() -> u32 {
    5
}

fn default_source_retry_delay() -> u64 {
    60
}

fn default_raw_data_dir() -> String {
    "raw_data".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}
