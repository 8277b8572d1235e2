//! Observer registration and synchronous change dispatch.
//!
//! Observers are registered against a dotted path (or the [`WILDCARD`]) and
//! fire in registration order whenever that path changes. Wildcard observers
//! fire after all path-specific observers, on every change. A panicking
//! observer is logged and skipped; it never blocks later observers and never
//! propagates to the caller of `set`/`update`.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;

/// Literal path that matches every change.
pub const WILDCARD: &str = "*";

/// Handle returned by `subscribe`. Passing it to `unsubscribe` removes
/// exactly that registration; other observers on the same path are untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A single state change, as observers see it.
#[derive(Debug, Clone, Copy)]
pub struct Change<'a> {
    /// Path that changed
    pub path: &'a str,
    /// Value now at the path
    pub new_value: &'a Value,
    /// Value previously at the path (`Null` when the path was absent)
    pub old_value: &'a Value,
}

/// Follow-up writes queued by observers during dispatch.
///
/// An observer cannot mutate the store while its own dispatch is running;
/// it queues writes here instead. The store applies them after the current
/// dispatch completes, in queue order, each as a full `set` with its own
/// dispatch — deferred, never inlined.
#[derive(Debug, Default)]
pub struct Effects {
    pub(crate) writes: Vec<(String, Value)>,
}

impl Effects {
    /// Queue a follow-up write.
    pub fn set(&mut self, path: impl Into<String>, value: Value) {
        self.writes.push((path.into(), value));
    }

    /// Number of queued writes.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

type Observer = Box<dyn FnMut(&Change, &mut Effects)>;

/// Ordered observer lists keyed by path, plus the wildcard list.
#[derive(Default)]
pub struct SubscriptionRegistry {
    listeners: HashMap<String, Vec<(SubscriptionId, Observer)>>,
    next_id: u64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `callback` to the list for `path`, creating the list if absent.
    pub fn subscribe(
        &mut self,
        path: &str,
        callback: impl FnMut(&Change, &mut Effects) + 'static,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners
            .entry(path.to_string())
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Remove the registration identified by `id`. Idempotent — a second
    /// call with the same id is a no-op.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        for callbacks in self.listeners.values_mut() {
            callbacks.retain(|(callback_id, _)| *callback_id != id);
        }
    }

    /// Number of observers currently registered for `path`.
    pub fn observer_count(&self, path: &str) -> usize {
        self.listeners.get(path).map_or(0, Vec::len)
    }

    /// Invoke every observer for `change.path` in registration order, then
    /// every wildcard observer. Fully synchronous: all observers have run
    /// (or been skipped after a panic) by the time this returns.
    pub fn dispatch(&mut self, change: &Change, effects: &mut Effects) {
        self.run_list(change.path, change, effects);
        if change.path != WILDCARD {
            self.run_list(WILDCARD, change, effects);
        }
    }

    fn run_list(&mut self, key: &str, change: &Change, effects: &mut Effects) {
        let Some(callbacks) = self.listeners.get_mut(key) else {
            return;
        };
        for (id, callback) in callbacks.iter_mut() {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(change, effects)));
            if outcome.is_err() {
                tracing::error!(
                    path = change.path,
                    subscription = ?id,
                    "observer panicked during dispatch, skipping"
                );
            }
        }
    }
}
