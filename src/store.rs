//! StateStore - the canonical state tree with change dispatch and
//! debounced persistence.
//!
//! The store owns the single nested state tree. Reads hand out deep copies,
//! writes go through dotted paths, and every effective write is dispatched
//! synchronously to the observers registered for that path (then to the
//! wildcard observers). Writes under a persist-worthy prefix arm a debounce
//! timer; the host drains it from its event loop via [`StateStore::flush_pending`].
//!
//! Failure policy: malformed paths, panicking observers, and storage errors
//! all degrade to logged no-ops — a UI action must never be aborted mid-flow
//! by state bookkeeping.

use std::collections::VecDeque;

use serde_json::{json, Map, Value};

use crate::config::StoreConfig;
use crate::debounce::Debouncer;
use crate::path;
use crate::persist::{PersistError, PersistenceAdapter};
use crate::subscription::{Change, Effects, SubscriptionId, SubscriptionRegistry, WILDCARD};

/// The statically defined initial state tree.
///
/// `reset` restores from this; a freshly constructed store starts here.
pub fn initial_state() -> Value {
    json!({
        "editor": {
            "content": "",
            "mode": "plain",
            "isDirty": false,
            "currentFile": null,
            "selection": { "start": 0, "end": 0, "text": "" },
            "cursor": { "line": 1, "column": 1 }
        },
        "ui": {
            "theme": "light",
            "sidebarOpen": true,
            "sidebarPinned": false,
            "quickActionsOpen": false,
            "activeModal": null,
            "isLoading": false
        },
        "find": {
            "searchTerm": "",
            "replaceTerm": "",
            "caseSensitive": false,
            "wholeWord": false,
            "useRegex": false,
            "matches": [],
            "currentMatch": -1
        },
        "statistics": {
            "charCount": 0,
            "charCountNoSpaces": 0,
            "wordCount": 0,
            "lineCount": 0,
            "paragraphCount": 0,
            "readingTime": 0
        },
        "preferences": {
            "autoSave": true,
            "wordWrap": true,
            "lineNumbers": true,
            "tabSize": 2,
            "fontSize": 15
        },
        "cache": {
            "recentFiles": [],
            "lastSaved": null
        }
    })
}

/// Owns the canonical state tree, the observer registry, and the
/// persistence schedule. Explicitly constructed and passed by reference —
/// no ambient global instance, so independent stores can coexist (tests).
pub struct StateStore {
    tree: Value,
    registry: SubscriptionRegistry,
    config: StoreConfig,
    adapter: Box<dyn PersistenceAdapter>,
    persist_timer: Debouncer,
    /// Set while observers run; deferred writes queue in `pending`.
    dispatching: bool,
    pending: VecDeque<(String, Value)>,
}

impl StateStore {
    pub fn new(config: StoreConfig, adapter: Box<dyn PersistenceAdapter>) -> Self {
        let persist_timer = Debouncer::new(config.debounce_interval());
        Self {
            tree: initial_state(),
            registry: SubscriptionRegistry::new(),
            config,
            adapter,
            persist_timer,
            dispatching: false,
            pending: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Full storage key (`{prefix}{logical_key}`) for this store's adapter.
    pub fn storage_key(&self, logical_key: &str) -> String {
        self.config.storage_key(logical_key)
    }

    pub fn adapter(&self) -> &dyn PersistenceAdapter {
        self.adapter.as_ref()
    }

    pub fn adapter_mut(&mut self) -> &mut dyn PersistenceAdapter {
        self.adapter.as_mut()
    }

    /// Deep copy of the value at `path`, or `None` when the path is absent.
    ///
    /// Returning a copy is deliberate: callers cannot mutate internal state
    /// through a returned value.
    pub fn get(&self, path: &str) -> Option<Value> {
        let segments = match path::parse(path) {
            Ok(segments) => segments,
            Err(e) => {
                tracing::warn!(path, error = %e, "ignoring get with invalid path");
                return None;
            }
        };
        path::read(&self.tree, &segments).cloned()
    }

    /// Deep copy of the entire tree.
    pub fn snapshot(&self) -> Value {
        self.tree.clone()
    }

    /// Write `value` at `path` and dispatch to observers.
    ///
    /// A value structurally equal to the current one is a complete no-op:
    /// no write, no dispatch, no persistence scheduling. A malformed path is
    /// a logged no-op. Dispatch is synchronous — every observer for this
    /// change has run by the time `set` returns.
    pub fn set(&mut self, path: &str, value: Value) {
        self.pending.push_back((path.to_string(), value));
        self.drain();
    }

    /// Apply several writes in the order supplied. Each entry is an
    /// independent `set` with its own dispatch, never batched into one
    /// notification.
    pub fn update(&mut self, entries: impl IntoIterator<Item = (String, Value)>) {
        for (path, value) in entries {
            self.set(&path, value);
        }
    }

    /// Restore the subtree at `path` (or the whole tree) to the initial
    /// state. Subtree resets route through `set`, so observers see a normal
    /// change; a whole-tree reset dispatches once to wildcard observers.
    pub fn reset(&mut self, path: Option<&str>) {
        match path {
            Some(path) => {
                let initial = initial_state();
                let segments = match path::parse(path) {
                    Ok(segments) => segments,
                    Err(e) => {
                        tracing::warn!(path, error = %e, "ignoring reset with invalid path");
                        return;
                    }
                };
                let value = path::read(&initial, &segments)
                    .cloned()
                    .unwrap_or(Value::Null);
                self.set(path, value);
            }
            None => {
                let old = std::mem::replace(&mut self.tree, initial_state());
                let new = self.tree.clone();
                self.persist_timer.arm();
                let mut effects = Effects::default();
                self.registry.dispatch(
                    &Change {
                        path: WILDCARD,
                        new_value: &new,
                        old_value: &old,
                    },
                    &mut effects,
                );
                self.pending.extend(effects.writes);
                self.drain();
            }
        }
    }

    /// Register an observer for `path` (or [`WILDCARD`]). Observers fire in
    /// registration order, path-specific before wildcard.
    pub fn subscribe(
        &mut self,
        path: &str,
        callback: impl FnMut(&Change, &mut Effects) + 'static,
    ) -> SubscriptionId {
        if path != WILDCARD {
            if let Err(e) = path::parse(path) {
                tracing::warn!(path, error = %e, "subscribing with invalid path, observer will never fire");
            }
        }
        self.registry.subscribe(path, callback)
    }

    /// Remove one observer. Idempotent.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.registry.unsubscribe(id);
    }

    pub fn observer_count(&self, path: &str) -> usize {
        self.registry.observer_count(path)
    }

    /// Write due persist-worthy sections to the adapter. Returns true when
    /// a flush actually ran. Call from the host's event loop.
    pub fn flush_pending(&mut self) -> Result<bool, PersistError> {
        if !self.persist_timer.take_due() {
            return Ok(false);
        }
        self.persist_now().map(|()| true)
    }

    /// Force an immediate flush (e.g. on shutdown), cancelling any pending
    /// debounce deadline.
    pub fn flush_now(&mut self) -> Result<(), PersistError> {
        self.persist_timer.cancel();
        self.persist_now()
    }

    /// True while a debounced flush is pending.
    pub fn persist_scheduled(&self) -> bool {
        self.persist_timer.is_armed()
    }

    /// Remove every persisted section from durable storage. In-memory state
    /// is untouched.
    pub fn clear_persisted(&mut self) {
        let keys: Vec<String> = self
            .config
            .persist_sections
            .iter()
            .map(|section| self.config.storage_key(&section.key))
            .collect();
        for key in keys {
            self.adapter.remove(&key);
        }
        self.persist_timer.cancel();
    }

    /// Merge persisted sections back into the tree, routed through `set` so
    /// observers see restored values as normal changes. Missing or corrupt
    /// keys are logged and skipped; in-memory defaults stay authoritative.
    pub fn load(&mut self) {
        let sections = self.config.persist_sections.clone();
        for section in sections {
            let key = self.config.storage_key(&section.key);
            let Some(serialized) = self.adapter.get(&key) else {
                continue;
            };
            match serde_json::from_str::<Value>(&serialized) {
                Ok(stored) => {
                    let merged = self.merge_with_current(&section.path, stored);
                    self.set(&section.path, merged);
                }
                Err(e) => {
                    tracing::warn!(%key, error = %e, "ignoring corrupt persisted section");
                }
            }
        }
        // Freshly loaded state does not write itself straight back
        self.persist_timer.cancel();
    }

    /// Object sections merge key-by-key over the in-memory defaults, so a
    /// payload from an older version keeps newer default fields.
    fn merge_with_current(&self, path: &str, stored: Value) -> Value {
        let current = self.get(path);
        match (current, stored) {
            (Some(Value::Object(current_map)), Value::Object(stored_map)) => {
                let mut merged: Map<String, Value> = current_map;
                for (key, value) in stored_map {
                    merged.insert(key, value);
                }
                Value::Object(merged)
            }
            (_, stored) => stored,
        }
    }

    fn drain(&mut self) {
        if self.dispatching {
            return;
        }
        self.dispatching = true;
        while let Some((path, value)) = self.pending.pop_front() {
            self.apply(&path, value);
        }
        self.dispatching = false;
    }

    fn apply(&mut self, path: &str, value: Value) {
        let segments = match path::parse(path) {
            Ok(segments) => segments,
            Err(e) => {
                tracing::warn!(path, error = %e, "ignoring set with invalid path");
                return;
            }
        };

        let old = path::read(&self.tree, &segments)
            .cloned()
            .unwrap_or(Value::Null);
        if old == value {
            return;
        }

        path::write(&mut self.tree, &segments, value.clone());

        if self.is_persist_worthy(path) {
            self.persist_timer.arm();
            tracing::trace!(path, "scheduled debounced persistence");
        }

        let mut effects = Effects::default();
        self.registry.dispatch(
            &Change {
                path,
                new_value: &value,
                old_value: &old,
            },
            &mut effects,
        );
        // Writes queued by observers run after this dispatch, in queue order
        self.pending.extend(effects.writes);
    }

    fn is_persist_worthy(&self, path: &str) -> bool {
        self.config
            .persist_sections
            .iter()
            .any(|section| paths_overlap(path, &section.path))
    }

    fn persist_now(&mut self) -> Result<(), PersistError> {
        let mut first_error = None;
        for section in &self.config.persist_sections {
            let segments = match path::parse(&section.path) {
                Ok(segments) => segments,
                Err(e) => {
                    tracing::warn!(path = %section.path, error = %e, "skipping persist section with invalid path");
                    continue;
                }
            };
            let value = path::read(&self.tree, &segments)
                .cloned()
                .unwrap_or(Value::Null);
            let serialized = match serde_json::to_string(&value) {
                Ok(serialized) => serialized,
                Err(e) => {
                    tracing::warn!(path = %section.path, error = %e, "skipping unserializable persist section");
                    continue;
                }
            };
            let key = self.config.storage_key(&section.key);
            if let Err(e) = self.adapter.set(&key, &serialized) {
                tracing::warn!(%key, error = %e, "persist failed, in-memory state stays authoritative");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

/// Whether one dotted path lies on the other's ancestor chain, segment-wise.
/// `ui.theme` overlaps `ui` and `ui.theme.accent`, but not `ui.themes`.
fn paths_overlap(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (shorter, longer) = if a.len() < b.len() { (a, b) } else { (b, a) };
    longer.starts_with(shorter) && longer.as_bytes().get(shorter.len()) == Some(&b'.')
}
