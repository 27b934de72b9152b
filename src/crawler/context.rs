use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::output::{ArtifactStore, FailedUrlLog};
use crate::ProxyError;
use std::sync::Arc;

/// Collaborators shared by every stage of one pipeline run
#[derive(Clone)]
pub struct StageContext {
    pub fetcher: Arc<Fetcher>,
    pub store: Arc<dyn ArtifactStore>,
    pub failed: Arc<FailedUrlLog>,
}

impl StageContext {
    pub fn new(fetcher: Arc<Fetcher>, store: Arc<dyn ArtifactStore>, failed: Arc<FailedUrlLog>) -> Self {
        Self {
            fetcher,
            store,
            failed,
        }
    }

    /// Fetches a page, reducing every per-URL failure to `None`
    ///
    /// Exhausted URLs are added to the failed URL log. Only a proxy pool that
    /// cannot supply any proxy is reported as an error.
    pub async fn fetch_page(&self, url: &str) -> Result<Option<Vec<u8>>, ProxyError> {
        match self.fetcher.fetch(url).await? {
            FetchResult::Success(body) => Ok(Some(body)),
            FetchResult::TerminalFailure(status) => {
                tracing::debug!("Skipping {} (HTTP {})", url, status);
                Ok(None)
            }
            FetchResult::Exhausted => {
                tracing::warn!(
                    "Failed to fetch {} after {} retries, saving to failed URL log",
                    url,
                    self.fetcher.policy().max_retries
                );
                self.failed.record(url);
                Ok(None)
            }
        }
    }
}
