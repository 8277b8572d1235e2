//! Most-recently-used document list
//!
//! Tracks documents opened in the editor. Entries live in the state tree at
//! `cache.recentFiles` (so observers of that path see updates) and reach
//! durable storage through the store's normal persist-section machinery.
//! MRU order with a capacity limit and an open-count for ranking.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::store::StateStore;

/// Tree path where the entry list lives.
pub const TREE_PATH: &str = "cache.recentFiles";

/// A single entry in the recent documents list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    /// Document name as shown to the user
    pub name: String,
    /// Timestamp when last opened (Unix epoch seconds)
    pub opened_at: u64,
    /// Number of times the document has been opened (for ranking)
    #[serde(default)]
    pub open_count: u32,
}

impl RecentEntry {
    /// Create a new entry for the current time
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            opened_at: now_epoch_secs(),
            open_count: 1,
        }
    }

    /// Update entry for re-opening
    pub fn touch(&mut self) {
        self.opened_at = now_epoch_secs();
        self.open_count += 1;
    }
}

pub(crate) fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Recent documents, most recent first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentDocuments {
    pub entries: Vec<RecentEntry>,
}

impl RecentDocuments {
    /// Add a document (or update if already present), enforcing `capacity`
    pub fn add(&mut self, name: &str, capacity: usize) {
        if let Some(idx) = self.find_index(name) {
            self.entries[idx].touch();
            let entry = self.entries.remove(idx);
            self.entries.insert(0, entry);
        } else {
            self.entries.insert(0, RecentEntry::new(name));
        }
        self.entries.truncate(capacity);
    }

    /// Remove a document from the list
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|e| e.name != name);
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read the list out of `cache.recentFiles`. An absent or malformed
    /// value yields an empty list.
    pub fn load_from(store: &StateStore) -> Self {
        let Some(value) = store.get(TREE_PATH) else {
            return Self::default();
        };
        match serde_json::from_value::<Vec<RecentEntry>>(value) {
            Ok(entries) => Self { entries },
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed recent documents list");
                Self::default()
            }
        }
    }

    /// Write the list back through the store, dispatching to observers of
    /// `cache.recentFiles`.
    pub fn store_into(&self, store: &mut StateStore) {
        match serde_json::to_value(&self.entries) {
            Ok(value) => store.set(TREE_PATH, value),
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize recent documents list");
            }
        }
    }

    fn find_index(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }
}
