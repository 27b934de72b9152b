//! Output module for persisting crawl results
//!
//! This module handles:
//! - The artifact store that doubles as the pipeline's checkpoint
//! - Canonical artifact names and locations
//! - Structured record types and their CSV/JSON sinks
//! - URL list reading and canonical rewriting
//! - The failed URL log

mod artifact;
mod failed;
pub mod records;
mod sinks;
mod store;

pub use artifact::{Artifact, ArtifactPaths};
pub use failed::FailedUrlLog;
pub use records::{AthleteRecord, AthleteRoleRecord, CsvRecord, HostCityRecord, NocCountryRecord};
pub use sinks::{write_csv, CsvSink, JsonArrayWriter, RecordSinks};
pub use store::{ArtifactStore, FsStore, MemoryStore, StoreError, StoreResult};

use std::collections::BTreeSet;

/// Reads a persisted URL list
///
/// # Returns
///
/// * `Some(urls)` - The artifact exists and parses as a JSON array of strings
/// * `None` - The artifact is missing or malformed (logged)
pub fn read_url_list(store: &dyn ArtifactStore, key: &str) -> Option<Vec<String>> {
    let bytes = match store.read(key) {
        Ok(bytes) => bytes,
        Err(StoreError::NotFound(_)) => return None,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", key, e);
            return None;
        }
    };

    match serde_json::from_slice::<Vec<String>>(&bytes) {
        Ok(urls) => Some(urls),
        Err(e) => {
            tracing::error!("Malformed URL list in {}: {}", key, e);
            None
        }
    }
}

/// Deduplicates and sorts URLs, then writes them as a pretty JSON array
///
/// # Returns
///
/// The canonical (sorted, unique) list that was written
pub fn write_url_list(
    store: &dyn ArtifactStore,
    key: &str,
    urls: impl IntoIterator<Item = String>,
) -> crate::Result<Vec<String>> {
    let unique: Vec<String> = urls.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    let bytes = serde_json::to_vec_pretty(&unique)?;
    store.write(key, &bytes)?;
    Ok(unique)
}
