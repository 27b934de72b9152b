//! Crawler module for fetching pages and running stages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching through rotating proxies with retry logic
//! - Throttled progress accounting
//! - The sentinel-terminated work queue and worker pool
//! - Frontier (link discovery) and scrape (record extraction) stages

mod context;
mod fetcher;
mod frontier;
mod progress;
mod queue;
mod scrape;
mod transport;
mod workers;

pub use context::StageContext;
pub use fetcher::{FetchResult, Fetcher, RetryPolicy, Sleeper, TokioSleeper};
pub use frontier::FrontierStage;
pub use progress::{format_eta, ProgressReport, ProgressState, ProgressTracker};
pub use queue::{WorkItem, WorkQueue};
pub use scrape::{extract_roles, scrape_page, RecordStage};
pub use transport::{build_http_client, RawResponse, ReqwestTransport, Transport, TransportError};
pub use workers::run_workers;

use crate::config::Config;
use crate::proxy::ProxyPool;
use std::sync::Arc;

/// Builds the production fetcher: reqwest transport, tokio sleeps
pub fn fetcher_from_config(config: &Config, pool: Arc<ProxyPool>) -> Fetcher {
    let transport = Arc::new(ReqwestTransport::new(config.fetcher.clone()));
    Fetcher::new(pool, transport, RetryPolicy::from_config(&config.fetcher))
}
