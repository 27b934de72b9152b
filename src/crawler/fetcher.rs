//! Page fetcher with proxy rotation and retry logic
//!
//! Every attempt goes out through a freshly sampled proxy. Outcomes are
//! classified as success, terminal (no retry), or retryable; retryable
//! failures back off exponentially up to a ceiling until the budget is spent.

use crate::config::FetcherConfig;
use crate::crawler::transport::{RawResponse, Transport, TransportError};
use crate::proxy::ProxyPool;
use crate::ProxyError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// HTTP 200 with a non-empty body
    Success(Vec<u8>),

    /// 403 or 404; retrying will not help
    TerminalFailure(u16),

    /// The retry budget ran out
    Exhausted,
}

/// Retry budget and backoff curve
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub backoff_factor: f64,
    pub max_wait: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs_f64(config.retry_delay_secs),
            backoff_factor: config.backoff_factor,
            max_wait: Duration::from_secs_f64(config.max_wait_secs),
        }
    }

    /// Wait before retry number `attempt` (1-based):
    /// `min(retry_delay * backoff_factor^(attempt - 1), max_wait)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.retry_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = secs.min(self.max_wait.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

/// Suspends a fetch between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

enum Outcome {
    Success,
    Terminal,
    Retry,
}

/// Classifies a response
///
/// | Condition | Action |
/// |-----------|--------|
/// | 200 with body | Success |
/// | 403, 404 | Terminal, no retry |
/// | 500, 502, 503, 504 | Retry with backoff |
/// | Anything else, including 200 with empty body | Retry with backoff |
fn classify(response: &RawResponse) -> Outcome {
    match response.status {
        200 if !response.body.is_empty() => Outcome::Success,
        403 | 404 => Outcome::Terminal,
        _ => Outcome::Retry,
    }
}

/// Fetches pages through the proxy pool
pub struct Fetcher {
    pool: Arc<ProxyPool>,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Fetcher {
    pub fn new(pool: Arc<ProxyPool>, transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            pool,
            transport,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the backoff sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }

    /// Fetches a URL with retries
    ///
    /// Proxies that fail at the transport level are removed from the pool
    /// before the next attempt. Intermediate failures are logged at debug
    /// level only; the final one is logged as a warning.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResult)` - The classified outcome
    /// * `Err(ProxyError)` - The pool could not supply a proxy; fatal to the run
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, ProxyError> {
        let max_retries = self.policy.max_retries;
        let mut attempts = 0;

        while attempts < max_retries {
            let proxy = self.pool.acquire().await?;

            let failure = match self.transport.get(url, &proxy).await {
                Ok(response) => match classify(&response) {
                    Outcome::Success => return Ok(FetchResult::Success(response.body)),
                    Outcome::Terminal => {
                        tracing::debug!("HTTP {} for {}, not retrying", response.status, url);
                        return Ok(FetchResult::TerminalFailure(response.status));
                    }
                    Outcome::Retry => format!("Status code {}", response.status),
                },
                Err(TransportError::Proxy(e)) => {
                    self.pool.mark_failed(&proxy);
                    format!("Proxy error via {}: {}", proxy, e)
                }
                Err(e) => e.to_string(),
            };

            attempts += 1;
            if attempts == max_retries {
                tracing::warn!(
                    "Error for {}: {}, reached max retries ({})",
                    url,
                    failure,
                    max_retries
                );
                break;
            }

            let wait = self.policy.delay_for(attempts);
            tracing::debug!(
                "Error for {}: {} (attempt {}/{}), retrying in {:?}",
                url,
                failure,
                attempts,
                max_retries,
                wait
            );
            self.sleeper.sleep(wait).await;
        }

        Ok(FetchResult::Exhausted)
    }
}
