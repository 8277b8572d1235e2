//! Bounded undo/redo history of document content snapshots.
//!
//! The timeline is a stack of full-content snapshots plus an index pointing
//! at the current one. Recording while the index is not at the tail discards
//! the forward history (a new edit branch invalidates redo state); the stack
//! is capped, evicting the oldest snapshot first. Full snapshots rather than
//! diffs: content size is bounded by the configured maximum file size, which
//! keeps snapshot cost predictable even for whole-buffer replacements.

use serde::{Deserialize, Serialize};

use crate::persist::{PersistError, PersistenceAdapter};

/// Logical storage key for the persisted history payload.
pub const HISTORY_KEY: &str = "history";

/// On-disk shape of the stack pair.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedHistory {
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
    index: usize,
}

/// Undo/redo stacks over document content snapshots.
///
/// Invariants: the undo stack always holds at least one snapshot (the
/// initial content), and `index` always points inside it.
#[derive(Debug, Clone)]
pub struct HistoryEngine {
    undo_stack: Vec<String>,
    redo_stack: Vec<String>,
    index: usize,
    max_depth: usize,
}

impl HistoryEngine {
    /// Create a history seeded with the current document content.
    ///
    /// `max_depth` below 1 is treated as 1.
    pub fn new(initial: &str, max_depth: usize) -> Self {
        Self {
            undo_stack: vec![initial.to_string()],
            redo_stack: Vec::new(),
            index: 0,
            max_depth: max_depth.max(1),
        }
    }

    /// Record a committed edit.
    ///
    /// A snapshot equal to the current one is never stored. Otherwise the
    /// forward history is discarded, the snapshot appended, and the redo
    /// stack cleared. Exceeding the cap evicts the oldest snapshot and
    /// shifts the index down to keep it on the same logical snapshot.
    pub fn record(&mut self, snapshot: &str) {
        if self.current() == snapshot {
            return;
        }
        self.undo_stack.truncate(self.index + 1);
        self.undo_stack.push(snapshot.to_string());
        self.index += 1;
        self.redo_stack.clear();
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
            self.index = self.index.saturating_sub(1);
        }
    }

    /// Step back one snapshot. Returns `None`, leaving all state untouched,
    /// when there is nothing to undo.
    pub fn undo(&mut self) -> Option<&str> {
        if self.index == 0 {
            return None;
        }
        let current = self.undo_stack[self.index].clone();
        self.redo_stack.push(current);
        self.index -= 1;
        Some(&self.undo_stack[self.index])
    }

    /// Step forward one snapshot. Returns `None`, leaving all state
    /// untouched, when the redo stack is empty.
    pub fn redo(&mut self) -> Option<&str> {
        let snapshot = self.redo_stack.pop()?;
        self.index += 1;
        if self.undo_stack.get(self.index) != Some(&snapshot) {
            // Forward entry not retained (restored history): rejoin the timeline here
            self.undo_stack.truncate(self.index);
            self.undo_stack.push(snapshot);
        }
        Some(&self.undo_stack[self.index])
    }

    /// Snapshot at the current position in the timeline.
    pub fn current(&self) -> &str {
        &self.undo_stack[self.index]
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of snapshots in the undo timeline.
    pub fn depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of snapshots available for redo.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Tear down and reseed for a brand-new document (e.g. file load): a
    /// single-snapshot stack and an empty redo stack.
    pub fn reseed(&mut self, content: &str) {
        self.undo_stack.clear();
        self.undo_stack.push(content.to_string());
        self.redo_stack.clear();
        self.index = 0;
    }

    /// Mirror the stack pair to durable storage under `{prefix}history`.
    pub fn save(
        &self,
        adapter: &mut dyn PersistenceAdapter,
        prefix: &str,
    ) -> Result<(), PersistError> {
        let payload = PersistedHistory {
            undo_stack: self.undo_stack.clone(),
            redo_stack: self.redo_stack.clone(),
            index: self.index,
        };
        let serialized = serde_json::to_string(&payload)
            .map_err(|e| PersistError::Other(format!("failed to serialize history: {e}")))?;
        adapter.set(&format!("{prefix}{HISTORY_KEY}"), &serialized)
    }

    /// Restore a previously saved stack pair. Returns false — leaving the
    /// engine untouched — when nothing is stored or the payload is
    /// malformed (empty stack, index out of range).
    pub fn restore(&mut self, adapter: &dyn PersistenceAdapter, prefix: &str) -> bool {
        let key = format!("{prefix}{HISTORY_KEY}");
        let Some(serialized) = adapter.get(&key) else {
            return false;
        };
        match serde_json::from_str::<PersistedHistory>(&serialized) {
            Ok(payload) if !payload.undo_stack.is_empty() && payload.index < payload.undo_stack.len() => {
                self.undo_stack = payload.undo_stack;
                self.redo_stack = payload.redo_stack;
                self.index = payload.index;
                while self.undo_stack.len() > self.max_depth {
                    self.undo_stack.remove(0);
                    self.index = self.index.saturating_sub(1);
                }
                true
            }
            Ok(_) => {
                tracing::warn!(%key, "ignoring persisted history with inconsistent shape");
                false
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "ignoring corrupt persisted history");
                false
            }
        }
    }
}
