use crate::config::types::{Config, CrawlerConfig, FetcherConfig, OutputConfig, ProxyConfig};
use crate::ConfigError;
use url::Url;

const MAX_WORKERS: usize = 200;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_base_url(&config.site.base_url)?;
    validate_crawler_config(&config.crawler)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_proxy_config(&config.proxy)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must use http or https",
            base_url
        )));
    }

    Ok(())
}

/// Validates per-stage worker counts
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    for (name, workers) in [
        ("country-workers", config.country_workers),
        ("event-workers", config.event_workers),
        ("athlete-workers", config.athlete_workers),
        ("scrape-workers", config.scrape_workers),
    ] {
        if workers < 1 || workers > MAX_WORKERS {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and {}, got {}",
                name, MAX_WORKERS, workers
            )));
        }
    }

    Ok(())
}

/// Validates retry budget and backoff settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max-retries must be >= 1".to_string(),
        ));
    }

    if !(config.backoff_factor >= 1.0) {
        return Err(ConfigError::Validation(format!(
            "backoff-factor must be >= 1.0, got {}",
            config.backoff_factor
        )));
    }

    if !(config.retry_delay_secs >= 0.0) || !(config.max_wait_secs >= 0.0) {
        return Err(ConfigError::Validation(
            "retry-delay-secs and max-wait-secs must be non-negative".to_string(),
        ));
    }

    if config.retry_delay_secs > config.max_wait_secs {
        return Err(ConfigError::Validation(format!(
            "retry-delay-secs ({}) cannot exceed max-wait-secs ({})",
            config.retry_delay_secs, config.max_wait_secs
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.source.trim().is_empty() {
        return Err(ConfigError::Validation(
            "proxy source cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.probe_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid probe-url: {}", e)))?;

    if config.validate_workers < 1 || config.validate_workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "validate-workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.validate_workers
        )));
    }

    if config.probe_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "probe-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.raw_data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "raw-data-dir cannot be empty".to_string(),
        ));
    }

    if config.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
