//! One-hop URL discovery stage
//!
//! Seeds fan out over a fixed number of workers. Each worker fetches a page,
//! asks the stage's [`PageToLinks`] rule for child URLs and appends them to
//! `<output>.partial` under a write lock, so discovered links survive a crash.
//! When the queue drains, the partial file is read back, deduplicated, sorted
//! and published under the canonical key.

use crate::crawler::context::StageContext;
use crate::crawler::progress::ProgressTracker;
use crate::crawler::workers::run_workers;
use crate::output::{read_url_list, write_url_list, JsonArrayWriter};
use crate::site::PageToLinks;
use crate::{HarvestError, Result};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

type SharedWriter = Arc<Mutex<Option<JsonArrayWriter<Box<dyn Write + Send>>>>>;

/// A frontier stage bound to its link rule and output location
pub struct FrontierStage {
    task: String,
    workers: usize,
    links: Arc<dyn PageToLinks>,
    output_key: String,
    partial_key: String,
}

impl FrontierStage {
    pub fn new(
        task: &str,
        workers: usize,
        links: Arc<dyn PageToLinks>,
        output_key: &str,
        partial_key: &str,
    ) -> Self {
        Self {
            task: task.to_string(),
            workers,
            links,
            output_key: output_key.to_string(),
            partial_key: partial_key.to_string(),
        }
    }

    /// Runs the stage over `seeds`
    ///
    /// # Returns
    ///
    /// * `Ok(urls)` - The canonical (sorted, unique) URL set that was published
    /// * `Err(HarvestError)` - The output could not be written or no proxy was left
    pub async fn run(&self, ctx: &StageContext, seeds: Vec<String>) -> Result<Vec<String>> {
        tracing::info!(
            "{}: {} pages with {} workers",
            self.task,
            seeds.len(),
            self.workers
        );

        let writer = JsonArrayWriter::open(ctx.store.create(&self.partial_key)?)?;
        let writer: SharedWriter = Arc::new(Mutex::new(Some(writer)));
        let progress = Arc::new(ProgressTracker::new(&self.task, seeds.len()));

        let handler = {
            let ctx = ctx.clone();
            let links = self.links.clone();
            let writer = writer.clone();
            move |url: String| {
                let ctx = ctx.clone();
                let links = links.clone();
                let writer = writer.clone();
                async move { discover(&ctx, links.as_ref(), &writer, &url).await }
            }
        };
        run_workers(seeds, self.workers, progress, handler).await?;

        let finished = writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(writer) = finished {
            writer.close()?;
        }

        self.publish(ctx)
    }

    /// Rewrites the partial output canonically and removes it
    fn publish(&self, ctx: &StageContext) -> Result<Vec<String>> {
        let Some(urls) = read_url_list(ctx.store.as_ref(), &self.partial_key) else {
            tracing::error!(
                "{}: partial output {} is unreadable, nothing published",
                self.task,
                self.partial_key
            );
            return Ok(Vec::new());
        };

        let appended = urls.len();
        let canonical = write_url_list(ctx.store.as_ref(), &self.output_key, urls)?;
        ctx.store.remove(&self.partial_key)?;

        tracing::info!(
            "{} completed. {} unique URLs ({} appended) saved to {}",
            self.task,
            canonical.len(),
            appended,
            self.output_key
        );
        Ok(canonical)
    }
}

async fn discover(
    ctx: &StageContext,
    links: &dyn PageToLinks,
    writer: &SharedWriter,
    url: &str,
) -> Result<()> {
    let Some(body) = ctx.fetch_page(url).await? else {
        tracing::debug!("No content fetched for {}", url);
        return Ok(());
    };

    let html = String::from_utf8_lossy(&body);
    let found: BTreeSet<String> = links.extract_links(url, &html).into_iter().collect();
    if found.is_empty() {
        tracing::debug!("No links found on {}", url);
        return Ok(());
    }

    let found: Vec<String> = found.into_iter().collect();
    let mut guard = writer.lock().unwrap_or_else(PoisonError::into_inner);
    match guard.as_mut() {
        Some(writer) => writer.write_entries(&found),
        None => Err(HarvestError::Io(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "stage output already closed",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fetcher::{Fetcher, RetryPolicy, Sleeper};
    use crate::crawler::transport::{RawResponse, Transport, TransportError};
    use crate::output::{ArtifactStore, FailedUrlLog, MemoryStore};
    use crate::proxy::{ProxyEndpoint, ProxyPool, ProxyProbe, ProxySource};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    struct AlwaysAlive;

    #[async_trait]
    impl ProxyProbe for AlwaysAlive {
        async fn is_alive(&self, _endpoint: &ProxyEndpoint) -> bool {
            true
        }
    }

    struct NoWait;

    #[async_trait]
    impl Sleeper for NoWait {
        async fn sleep(&self, _duration: Duration) {}
    }

    /// Serves comma-separated link names; unknown pages are 404
    struct LinkSite {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl Transport for LinkSite {
        async fn get(&self, url: &str, _proxy: &ProxyEndpoint) -> std::result::Result<RawResponse, TransportError> {
            match self.pages.get(url) {
                Some(body) => Ok(RawResponse::new(200, body.as_bytes().to_vec())),
                None => Ok(RawResponse::new(404, Vec::new())),
            }
        }
    }

    struct CommaLinks;

    impl PageToLinks for CommaLinks {
        fn extract_links(&self, _page_url: &str, html: &str) -> Vec<String> {
            html.split(',')
                .filter(|s| !s.is_empty())
                .map(|s| format!("https://x.org/{}", s.trim()))
                .collect()
        }
    }

    async fn context(pages: &[(&str, &str)]) -> (StageContext, Arc<MemoryStore>) {
        let pool = ProxyPool::new(
            ProxySource::Lines(vec!["10.0.0.1:8080:u:p".to_string()]),
            Arc::new(AlwaysAlive),
            1,
        );
        pool.load().await.unwrap();
        let site = LinkSite {
            pages: pages
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        let fetcher = Fetcher::new(Arc::new(pool), Arc::new(site), RetryPolicy::default())
            .with_sleeper(Arc::new(NoWait));
        let store = Arc::new(MemoryStore::new());
        let failed = Arc::new(FailedUrlLog::new(store.clone(), "raw/failed.json"));
        (StageContext::new(Arc::new(fetcher), store.clone(), failed), store)
    }

    fn stage(workers: usize) -> FrontierStage {
        FrontierStage::new("Fetching test URLs", workers, Arc::new(CommaLinks), "raw/out.json", "raw/out.json.partial")
    }

    #[tokio::test]
    async fn test_output_is_union_of_discovered_links() {
        let (ctx, store) = context(&[
            ("https://x.org/s1", "a,b,c"),
            ("https://x.org/s2", "c,d"),
            ("https://x.org/s3", "a,e,e"),
        ])
        .await;
        let seeds = vec![
            "https://x.org/s1".to_string(),
            "https://x.org/s2".to_string(),
            "https://x.org/s3".to_string(),
        ];

        let urls = stage(3).run(&ctx, seeds).await.unwrap();

        let expected: Vec<String> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|s| format!("https://x.org/{}", s))
            .collect();
        assert_eq!(urls, expected);
        assert_eq!(read_url_list(store.as_ref(), "raw/out.json"), Some(expected));
        assert!(!store.exists("raw/out.json.partial"));
    }

    #[tokio::test]
    async fn test_missing_pages_contribute_nothing() {
        let (ctx, store) = context(&[("https://x.org/s1", "a")]).await;
        let seeds = vec!["https://x.org/s1".to_string(), "https://x.org/gone".to_string()];

        let urls = stage(2).run(&ctx, seeds).await.unwrap();

        assert_eq!(urls, vec!["https://x.org/a"]);
        // 404 is terminal, not a failed URL
        assert!(ctx.failed.is_empty());
        assert!(store.exists("raw/out.json"));
    }

    #[tokio::test]
    async fn test_no_links_publishes_empty_list() {
        let (ctx, store) = context(&[("https://x.org/s1", ",")]).await;
        let urls = stage(1)
            .run(&ctx, vec!["https://x.org/s1".to_string()])
            .await
            .unwrap();

        assert!(urls.is_empty());
        assert_eq!(read_url_list(store.as_ref(), "raw/out.json"), Some(Vec::new()));
    }
}
