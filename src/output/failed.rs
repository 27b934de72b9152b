use crate::output::store::ArtifactStore;
use std::sync::{Arc, Mutex, PoisonError};

/// URLs that exhausted their retry budget during a run
///
/// The whole list is rewritten on every addition so the file on disk is always
/// a valid JSON array. It is written for operators; the pipeline never reads it
/// back.
pub struct FailedUrlLog {
    store: Arc<dyn ArtifactStore>,
    key: String,
    urls: Mutex<Vec<String>>,
}

impl FailedUrlLog {
    pub fn new(store: Arc<dyn ArtifactStore>, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Adds a URL and saves the full list, overwriting the previous file
    pub fn record(&self, url: &str) {
        let mut urls = self.urls.lock().unwrap_or_else(PoisonError::into_inner);
        urls.push(url.to_string());

        let saved = serde_json::to_vec_pretty(&*urls)
            .map_err(|e| e.to_string())
            .and_then(|bytes| self.store.write(&self.key, &bytes).map_err(|e| e.to_string()));
        if let Err(e) = saved {
            tracing::warn!("Failed to save failed URL log {}: {}", self.key, e);
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
