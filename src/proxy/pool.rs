//! Health-checked pool of outbound proxies
//!
//! The pool owns the live endpoint set. Workers borrow a clone per request and
//! report transport-level failures back through [`ProxyPool::mark_failed`].
//! When attrition drops the live set below half of what the last load
//! produced, the next caller of [`ProxyPool::acquire`] revalidates the whole
//! list. Only one reload runs at a time; concurrent callers wait for it and
//! then share its outcome: they sample from the fresh set, or get the same
//! error when the reload found nothing alive.

use crate::proxy::{ProxyEndpoint, ProxyProbe, ProxySource};
use crate::ProxyError;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Default)]
struct PoolState {
    live: Vec<ProxyEndpoint>,
    original_count: usize,
    /// Bumped by every reload attempt, successful or not
    generation: u64,
    last_failure: Option<ProxyError>,
}

impl PoolState {
    fn below_low_water_mark(&self) -> bool {
        self.live.is_empty() || self.live.len() * 2 < self.original_count
    }
}

/// Pool of validated proxies with low-water-mark reloading
pub struct ProxyPool {
    source: ProxySource,
    probe: Arc<dyn ProxyProbe>,
    validate_workers: usize,
    state: Mutex<PoolState>,
    reload_lock: tokio::sync::Mutex<()>,
    reloads: AtomicUsize,
}

impl ProxyPool {
    /// Creates an empty pool; the first [`load`](Self::load) or
    /// [`acquire`](Self::acquire) populates it.
    pub fn new(source: ProxySource, probe: Arc<dyn ProxyProbe>, validate_workers: usize) -> Self {
        Self {
            source,
            probe,
            validate_workers: validate_workers.max(1),
            state: Mutex::new(PoolState::default()),
            reload_lock: tokio::sync::Mutex::new(()),
            reloads: AtomicUsize::new(0),
        }
    }

    /// Loads and validates the proxy list, replacing the live set
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of proxies that passed the liveness probe
    /// * `Err(ProxyError::NoProxiesAvailable)` - No candidate passed
    pub async fn load(&self) -> Result<usize, ProxyError> {
        let _guard = self.reload_lock.lock().await;
        self.reload().await
    }

    /// Returns a uniformly random live proxy, reloading first if the pool has
    /// dropped below half of its loaded size
    pub async fn acquire(&self) -> Result<ProxyEndpoint, ProxyError> {
        loop {
            let seen = {
                let state = self.lock_state();
                state.below_low_water_mark().then_some(state.generation)
            };

            if let Some(seen) = seen {
                let _guard = self.reload_lock.lock().await;
                let (generation, failure) = {
                    let state = self.lock_state();
                    (state.generation, state.last_failure.clone())
                };

                if generation == seen {
                    tracing::info!(
                        "Proxy count dropped below 50% ({}/{}), revalidating proxies",
                        self.live_count(),
                        self.original_count()
                    );
                    self.reload().await?;
                } else if let Some(e) = failure {
                    // The reload we waited for came up empty
                    return Err(e);
                }
            }

            if let Some(endpoint) = self.sample() {
                return Ok(endpoint);
            }
        }
    }

    /// Removes a proxy from the live set
    pub fn mark_failed(&self, endpoint: &ProxyEndpoint) {
        let mut state = self.lock_state();
        let before = state.live.len();
        state.live.retain(|live| live != endpoint);
        if state.live.len() < before {
            tracing::debug!(
                "Proxy {} marked failed, {} remaining",
                endpoint,
                state.live.len()
            );
        }
    }

    pub fn live_count(&self) -> usize {
        self.lock_state().live.len()
    }

    /// Size of the live set right after the most recent load
    pub fn original_count(&self) -> usize {
        self.lock_state().original_count
    }

    /// Number of completed loads, including the initial one
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn live_endpoints(&self) -> Vec<ProxyEndpoint> {
        self.lock_state().live.clone()
    }

    fn sample(&self) -> Option<ProxyEndpoint> {
        let state = self.lock_state();
        if state.live.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..state.live.len());
        Some(state.live[index].clone())
    }

    /// Caller must hold `reload_lock`
    async fn reload(&self) -> Result<usize, ProxyError> {
        let result = self.revalidate().await;

        let mut state = self.lock_state();
        state.generation += 1;
        state.last_failure = result.as_ref().err().cloned();
        result
    }

    async fn revalidate(&self) -> Result<usize, ProxyError> {
        let candidates = self.source.load_candidates().await?;
        let total = candidates.len();
        let live = self.validate(candidates).await;

        if live.is_empty() {
            tracing::error!("None of {} proxy candidates passed validation", total);
            return Err(ProxyError::NoProxiesAvailable);
        }

        let count = live.len();
        {
            let mut state = self.lock_state();
            state.live = live;
            state.original_count = count;
        }
        self.reloads.fetch_add(1, Ordering::SeqCst);

        tracing::info!("Loaded {} working proxies (of {} candidates)", count, total);
        Ok(count)
    }

    /// Probes every candidate, at most `validate_workers` at a time
    async fn validate(&self, candidates: Vec<ProxyEndpoint>) -> Vec<ProxyEndpoint> {
        let semaphore = Arc::new(Semaphore::new(self.validate_workers));
        let mut tasks = JoinSet::new();

        for candidate in candidates {
            let semaphore = semaphore.clone();
            let probe = self.probe.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                let alive = probe.is_alive(&candidate).await;
                alive.then_some(candidate)
            });
        }

        let mut live = Vec::new();
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(Some(endpoint)) => live.push(endpoint),
                Ok(None) => {}
                Err(e) => tracing::warn!("Proxy validation task failed: {}", e),
            }
        }
        live
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
