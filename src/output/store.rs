//! Artifact store traits and implementations
//!
//! Every file a stage produces goes through an [`ArtifactStore`], keyed by a
//! relative path such as `raw_data/events_urls.json`. The pipeline decides
//! whether a stage is already done purely from [`ArtifactStore::exists`].

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors that can occur during artifact operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("IO error on {key}: {source}")]
    Io { key: String, source: io::Error },
}

impl StoreError {
    fn io(key: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(key.to_string())
        } else {
            StoreError::Io {
                key: key.to_string(),
                source,
            }
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Checkpoint storage shared by all pipeline stages
///
/// Implementations must be safe to call from many workers at once; callers
/// serialize writes to a single key themselves.
pub trait ArtifactStore: Send + Sync {
    /// Whether an artifact exists under `key`
    fn exists(&self, key: &str) -> bool;

    /// Reads the full artifact
    fn read(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Replaces the artifact with `bytes`
    fn write(&self, key: &str, bytes: &[u8]) -> StoreResult<()>;

    /// Truncates the artifact and returns a streaming writer for it
    fn create(&self, key: &str) -> StoreResult<Box<dyn Write + Send>>;

    /// Moves an artifact to a new key, replacing any existing one
    fn rename(&self, from: &str, to: &str) -> StoreResult<()>;

    /// Deletes an artifact; deleting a missing artifact is not an error
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Filesystem-backed store rooted at a directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute keys bypass the root
    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn ensure_parent(&self, key: &str, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(key, e))?;
        }
        Ok(())
    }
}

impl ArtifactStore for FsStore {
    fn exists(&self, key: &str) -> bool {
        self.path(key).is_file()
    }

    fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
        fs::read(self.path(key)).map_err(|e| StoreError::io(key, e))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        let path = self.path(key);
        self.ensure_parent(key, &path)?;
        fs::write(&path, bytes).map_err(|e| StoreError::io(key, e))
    }

    fn create(&self, key: &str) -> StoreResult<Box<dyn Write + Send>> {
        let path = self.path(key);
        self.ensure_parent(key, &path)?;
        let file = File::create(&path).map_err(|e| StoreError::io(key, e))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn rename(&self, from: &str, to: &str) -> StoreResult<()> {
        let target = self.path(to);
        self.ensure_parent(to, &target)?;
        fs::rename(self.path(from), &target).map_err(|e| StoreError::io(from, e))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }
}

type Files = Arc<Mutex<HashMap<String, Vec<u8>>>>;

fn lock_files(files: &Files) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
    files.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory store for tests and dry runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Files,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted list of stored keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock_files(&self.files).keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl ArtifactStore for MemoryStore {
    fn exists(&self, key: &str) -> bool {
        lock_files(&self.files).contains_key(key)
    }

    fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
        lock_files(&self.files)
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        lock_files(&self.files).insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn create(&self, key: &str) -> StoreResult<Box<dyn Write + Send>> {
        lock_files(&self.files).insert(key.to_string(), Vec::new());
        Ok(Box::new(MemoryWriter {
            key: key.to_string(),
            files: self.files.clone(),
        }))
    }

    fn rename(&self, from: &str, to: &str) -> StoreResult<()> {
        let mut files = lock_files(&self.files);
        let bytes = files
            .remove(from)
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        files.insert(to.to_string(), bytes);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        lock_files(&self.files).remove(key);
        Ok(())
    }
}

/// Appends straight into the shared map, so readers see every flushed write
struct MemoryWriter {
    key: String,
    files: Files,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock_files(&self.files)
            .entry(self.key.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
