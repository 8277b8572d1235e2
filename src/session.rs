//! Editor session - ties the state store and history engine together.
//!
//! The editing surface talks to this layer: committed edits land in the
//! document path of the store and in the undo history, undo/redo snapshots
//! are written back through the store (re-triggering normal dispatch), and
//! document content autosaves after a quiet period. The session owns both
//! components; nothing else mutates them.

use serde_json::{json, Value};

use crate::debounce::Debouncer;
use crate::history::HistoryEngine;
use crate::persist::PersistError;
use crate::recent::{now_epoch_secs, RecentDocuments};
use crate::stats::TextStatistics;
use crate::store::StateStore;

/// Logical storage key for the autosaved document content.
pub const CONTENT_KEY: &str = "content";

pub struct EditorSession {
    store: StateStore,
    history: HistoryEngine,
    autosave: Debouncer,
}

impl EditorSession {
    /// Build a session around `store`, seeding the history with whatever
    /// document content the store currently holds.
    pub fn new(store: StateStore) -> Self {
        let seed = content_of(&store);
        let history = HistoryEngine::new(&seed, store.config().max_undo_depth);
        let autosave = Debouncer::new(store.config().autosave_interval());
        Self {
            store,
            history,
            autosave,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    pub fn history(&self) -> &HistoryEngine {
        &self.history
    }

    /// Current document content.
    pub fn content(&self) -> String {
        content_of(&self.store)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Commit a (non-transient) edit: update the document path, record a
    /// history snapshot, refresh statistics, and schedule autosave when
    /// enabled. Content over the configured maximum file size is rejected
    /// with a logged no-op.
    pub fn commit(&mut self, content: &str) -> bool {
        let limit = self.store.config().max_file_size;
        if content.len() > limit {
            tracing::warn!(
                size = content.len(),
                limit,
                "rejecting oversized document edit"
            );
            return false;
        }

        self.store
            .set("editor.content", Value::String(content.to_string()));
        self.store.set("editor.isDirty", Value::Bool(true));
        self.history.record(content);
        self.refresh_statistics();
        if self.autosave_enabled() {
            self.autosave.arm();
        }
        true
    }

    /// Step the document back one snapshot. `None` when there is nothing
    /// to undo.
    pub fn undo(&mut self) -> Option<String> {
        let snapshot = self.history.undo()?.to_string();
        self.apply_snapshot(&snapshot);
        Some(snapshot)
    }

    /// Step the document forward one snapshot. `None` when there is nothing
    /// to redo.
    pub fn redo(&mut self) -> Option<String> {
        let snapshot = self.history.redo()?.to_string();
        self.apply_snapshot(&snapshot);
        Some(snapshot)
    }

    /// Replace the current document with a brand-new one: reseed the
    /// history, update the document paths, and touch the recent list.
    pub fn load_document(&mut self, name: &str, content: &str) -> bool {
        let limit = self.store.config().max_file_size;
        if content.len() > limit {
            tracing::warn!(name, size = content.len(), limit, "rejecting oversized document");
            return false;
        }

        self.history.reseed(content);
        self.store.update([
            (
                "editor.content".to_string(),
                Value::String(content.to_string()),
            ),
            (
                "editor.currentFile".to_string(),
                Value::String(name.to_string()),
            ),
            ("editor.isDirty".to_string(), Value::Bool(false)),
        ]);
        self.refresh_statistics();

        let capacity = self.store.config().max_recent_files;
        let mut recent = RecentDocuments::load_from(&self.store);
        recent.add(name, capacity);
        recent.store_into(&mut self.store);
        true
    }

    /// Restore persisted state, document content, and history from storage.
    pub fn restore(&mut self) {
        self.store.load();

        let key = self.store.storage_key(CONTENT_KEY);
        if let Some(content) = self.store.adapter().get(&key) {
            self.history.reseed(&content);
            self.store.set("editor.content", Value::String(content));
            self.store.set("editor.isDirty", Value::Bool(false));
        }

        let prefix = self.store.config().storage_prefix.clone();
        if self.history.restore(self.store.adapter(), &prefix) {
            let current = self.history.current().to_string();
            self.store.set("editor.content", Value::String(current));
            self.store.set("editor.isDirty", Value::Bool(false));
        }

        self.refresh_statistics();
    }

    /// Drive due debounced effects: persist-worthy state sections and the
    /// content autosave. Call from the host's event loop. The first storage
    /// error is returned for hosts that want to notify the user; in-memory
    /// state is unaffected either way.
    pub fn flush_pending(&mut self) -> Result<(), PersistError> {
        let store_result = self.store.flush_pending().map(|_| ());
        let autosave_result = if self.autosave.take_due() {
            self.save_content()
        } else {
            Ok(())
        };
        store_result.and(autosave_result)
    }

    /// Flush everything immediately (e.g. on shutdown), cancelling pending
    /// deadlines.
    pub fn flush_now(&mut self) -> Result<(), PersistError> {
        self.autosave.cancel();
        let content_result = self.save_content();
        let store_result = self.store.flush_now();
        content_result.and(store_result)
    }

    /// True while a debounced autosave is pending.
    pub fn autosave_scheduled(&self) -> bool {
        self.autosave.is_armed()
    }

    fn apply_snapshot(&mut self, snapshot: &str) {
        self.store
            .set("editor.content", Value::String(snapshot.to_string()));
        self.store.set("editor.isDirty", Value::Bool(true));
        self.refresh_statistics();
        if self.autosave_enabled() {
            self.autosave.arm();
        }
    }

    fn refresh_statistics(&mut self) {
        let content = self.content();
        let wpm = self.store.config().reading_speed_wpm;
        TextStatistics::measure(&content, wpm).apply_to(&mut self.store);
    }

    fn autosave_enabled(&self) -> bool {
        self.store
            .get("preferences.autoSave")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn save_content(&mut self) -> Result<(), PersistError> {
        let content = self.content();
        let key = self.store.storage_key(CONTENT_KEY);
        if let Err(e) = self.store.adapter_mut().set(&key, &content) {
            tracing::warn!(%key, error = %e, "autosave failed, document kept in memory");
            return Err(e);
        }

        let prefix = self.store.config().storage_prefix.clone();
        if let Err(e) = self.history.save(self.store.adapter_mut(), &prefix) {
            tracing::warn!(error = %e, "failed to persist history");
        }

        self.store.set("editor.isDirty", Value::Bool(false));
        self.store.set("cache.lastSaved", json!(now_epoch_secs()));
        Ok(())
    }
}

fn content_of(store: &StateStore) -> String {
    store
        .get("editor.content")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
