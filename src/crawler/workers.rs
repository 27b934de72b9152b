//! Fixed-size worker pool over a [`WorkQueue`]
//!
//! Used by every multi-URL stage. Each job counts one progress unit whether
//! it succeeded or not. The first fatal error is kept; after it the remaining
//! workers keep draining the queue without doing any work, so the stage
//! still terminates through the sentinel protocol.

use crate::crawler::progress::ProgressTracker;
use crate::crawler::queue::{WorkItem, WorkQueue};
use crate::{HarvestError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

struct FirstError {
    aborted: AtomicBool,
    error: Mutex<Option<HarvestError>>,
}

impl FirstError {
    fn new() -> Self {
        Self {
            aborted: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    fn record(&self, error: HarvestError) {
        let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            tracing::error!("Stopping stage: {}", error);
            *slot = Some(error);
        }
        self.aborted.store(true, Ordering::SeqCst);
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn take(&self) -> Option<HarvestError> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Runs `handler` over `jobs` with `workers` concurrent tasks
///
/// Returns once the queue is drained and every worker has exited.
///
/// # Returns
///
/// * `Ok(())` - Every job was handled (per-URL failures are the handler's concern)
/// * `Err(HarvestError)` - The first fatal error a handler returned, or a worker panic
pub async fn run_workers<F, Fut>(
    jobs: Vec<String>,
    workers: usize,
    progress: Arc<ProgressTracker>,
    handler: F,
) -> Result<()>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let workers = workers.max(1);
    let queue = Arc::new(WorkQueue::with_sentinels(jobs, workers));
    let handler = Arc::new(handler);
    let failure = Arc::new(FirstError::new());
    let mut set = JoinSet::new();

    for _ in 0..workers {
        let queue = queue.clone();
        let handler = handler.clone();
        let progress = progress.clone();
        let failure = failure.clone();

        set.spawn(async move {
            loop {
                match queue.next() {
                    WorkItem::Stop => {
                        queue.task_done();
                        break;
                    }
                    WorkItem::Job(url) => {
                        if !failure.is_aborted() {
                            if let Err(e) = handler(url).await {
                                failure.record(e);
                            }
                            progress.increment();
                        }
                        queue.task_done();
                    }
                }
            }
        });
    }

    while let Some(joined) = set.join_next().await {
        joined?;
    }
    queue.join().await;

    match failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
