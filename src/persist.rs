//! Durable key/value persistence.
//!
//! The store and history engine mirror parts of their state through a
//! [`PersistenceAdapter`]: string keys to serialized JSON values, one key
//! per logical section, all keys sharing a configured application prefix.
//! Persistence is best-effort — a failed write leaves the in-memory state
//! authoritative and only the durable copy stale.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

/// Failure writing to durable storage. Quota exhaustion is distinguished so
/// the host UI can suggest freeing space; everything else is opaque.
#[derive(Debug, Clone, Error)]
pub enum PersistError {
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("storage error: {0}")]
    Other(String),
}

/// Durable key/value storage consumed by the store and history engine.
///
/// Values round-trip exactly: `get` after a successful `set` yields the
/// stored string unchanged.
pub trait PersistenceAdapter {
    /// Fetch the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError>;

    /// Remove `key`. Removing an absent key is a no-op.
    fn remove(&mut self, key: &str);
}

/// In-memory adapter with an optional byte quota.
///
/// The quota makes `QuotaExceeded` reproducible in tests; without one the
/// adapter never fails.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    entries: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter that rejects writes once keys plus values exceed the quota.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn used_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum()
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        if let Some(quota) = self.quota_bytes {
            let existing = self.entries.get(key).map_or(0, |v| key.len() + v.len());
            let projected = self.used_bytes() - existing + key.len() + value.len();
            if projected > quota {
                return Err(PersistError::QuotaExceeded);
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// File-backed adapter: one file per key under a directory.
///
/// Default location is the application storage directory
/// (`~/.config/scribe/storage/`, see `config_paths`).
#[derive(Debug, Clone)]
pub struct FileAdapter {
    dir: PathBuf,
}

impl FileAdapter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Adapter rooted at the default storage directory, or `None` when no
    /// config directory is available.
    pub fn default_location() -> Option<Self> {
        crate::config_paths::storage_dir().map(Self::new)
    }

    fn file_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl PersistenceAdapter for FileAdapter {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.file_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            return Err(PersistError::Other(format!(
                "failed to create storage directory {}: {}",
                self.dir.display(),
                e
            )));
        }
        let path = self.file_for(key);
        fs::write(&path, value).map_err(|e| match e.kind() {
            ErrorKind::StorageFull | ErrorKind::QuotaExceeded => PersistError::QuotaExceeded,
            _ => PersistError::Other(format!("failed to write {}: {}", path.display(), e)),
        })
    }

    fn remove(&mut self, key: &str) {
        let path = self.file_for(key);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::debug!("failed to remove {}: {}", path.display(), e);
            }
        }
    }
}
