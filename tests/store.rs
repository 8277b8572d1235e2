//! State store tests
//!
//! Covers path round-trips, structural no-op detection, dispatch ordering,
//! observer isolation, deferred re-entrant writes, and debounced
//! persistence.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};

use scribe::config::{PersistSection, StoreConfig};
use scribe::persist::{MemoryAdapter, PersistError, PersistenceAdapter};
use scribe::store::{initial_state, StateStore};
use scribe::subscription::WILDCARD;

use common::{test_store, test_store_with};

// ========================================================================
// Get / Set
// ========================================================================

#[test]
fn test_path_round_trip() {
    let mut store = test_store();
    let value = json!({ "start": 2, "end": 7, "text": "lorem" });

    store.set("editor.selection", value.clone());
    assert_eq!(store.get("editor.selection"), Some(value));
}

#[test]
fn test_set_creates_missing_intermediates() {
    let mut store = test_store();
    store.set("plugins.spellcheck.enabled", json!(true));
    assert_eq!(store.get("plugins.spellcheck.enabled"), Some(json!(true)));
    assert!(store.get("plugins.spellcheck").is_some());
}

#[test]
fn test_get_missing_path_returns_none() {
    let store = test_store();
    assert_eq!(store.get("editor.nonexistent"), None);
}

#[test]
fn test_get_returns_deep_copy() {
    let mut store = test_store();
    store.set("editor.selection", json!({ "start": 0, "end": 3 }));

    let mut copy = store.get("editor.selection").unwrap();
    copy["start"] = json!(99);

    assert_eq!(
        store.get("editor.selection"),
        Some(json!({ "start": 0, "end": 3 }))
    );
}

#[test]
fn test_snapshot_returns_deep_copy() {
    let mut store = test_store();
    let mut snapshot = store.snapshot();
    snapshot["editor"]["content"] = json!("mutated");

    assert_eq!(store.get("editor.content"), Some(json!("")));
}

#[test]
fn test_fresh_store_matches_initial_state() {
    let store = test_store();
    assert_eq!(store.snapshot(), initial_state());
}

// ========================================================================
// Structural no-op detection
// ========================================================================

#[test]
fn test_equal_value_dispatches_once() {
    let mut store = test_store();
    let count = Rc::new(RefCell::new(0));

    let observer_count = Rc::clone(&count);
    store.subscribe("ui.theme", move |_, _| *observer_count.borrow_mut() += 1);

    store.set("ui.theme", json!("dark"));
    store.set("ui.theme", json!("dark"));

    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_equal_value_schedules_persistence_once() {
    let mut store = test_store();

    store.set("ui.theme", json!("dark"));
    assert!(store.persist_scheduled());
    assert!(store.flush_pending().unwrap());

    // Same structural value again: no write, no re-arm
    store.set("ui.theme", json!("dark"));
    assert!(!store.persist_scheduled());
    assert!(!store.flush_pending().unwrap());
}

#[test]
fn test_equality_is_structural_not_reference() {
    let mut store = test_store();
    let count = Rc::new(RefCell::new(0));

    let observer_count = Rc::clone(&count);
    store.subscribe("editor.selection", move |_, _| {
        *observer_count.borrow_mut() += 1;
    });

    store.set("editor.selection", json!({ "start": 1, "end": 2, "text": "x" }));
    // A fresh but structurally equal value is still a no-op
    store.set("editor.selection", json!({ "start": 1, "end": 2, "text": "x" }));

    assert_eq!(*count.borrow(), 1);
}

// ========================================================================
// Dispatch ordering
// ========================================================================

#[test]
fn test_dispatch_order_registration_then_wildcard() {
    let mut store = test_store();
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

    let wildcard_log = Rc::clone(&log);
    store.subscribe(WILDCARD, move |change, _| {
        wildcard_log
            .borrow_mut()
            .push(format!("wildcard:{}", change.path));
    });

    for name in ["a", "b", "c"] {
        let log = Rc::clone(&log);
        store.subscribe("ui.theme", move |_, _| log.borrow_mut().push(name.to_string()));
    }

    store.set("ui.theme", json!("dark"));

    assert_eq!(
        *log.borrow(),
        vec!["a", "b", "c", "wildcard:ui.theme"]
    );
}

#[test]
fn test_observer_receives_new_and_old_value() {
    let mut store = test_store();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let observer_seen = Rc::clone(&seen);
    store.subscribe("ui.theme", move |change, _| {
        observer_seen
            .borrow_mut()
            .push((change.new_value.clone(), change.old_value.clone()));
    });

    store.set("ui.theme", json!("dark"));
    store.set("ui.theme", json!("sepia"));

    assert_eq!(
        *seen.borrow(),
        vec![
            (json!("dark"), json!("light")),
            (json!("sepia"), json!("dark")),
        ]
    );
}

#[test]
fn test_old_value_is_null_for_new_path() {
    let mut store = test_store();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let observer_seen = Rc::clone(&seen);
    store.subscribe("plugins.enabled", move |change, _| {
        observer_seen.borrow_mut().push(change.old_value.clone());
    });

    store.set("plugins.enabled", json!(true));
    assert_eq!(*seen.borrow(), vec![Value::Null]);
}

#[test]
fn test_update_dispatches_in_supplied_order() {
    let mut store = test_store();
    let log = Rc::new(RefCell::new(Vec::new()));

    let observer_log = Rc::clone(&log);
    store.subscribe(WILDCARD, move |change, _| {
        observer_log.borrow_mut().push(change.path.to_string());
    });

    store.update([
        ("find.searchTerm".to_string(), json!("needle")),
        ("find.caseSensitive".to_string(), json!(true)),
        ("find.currentMatch".to_string(), json!(0)),
    ]);

    assert_eq!(
        *log.borrow(),
        vec!["find.searchTerm", "find.caseSensitive", "find.currentMatch"]
    );
}

// ========================================================================
// Observer isolation
// ========================================================================

#[test]
fn test_panicking_observer_does_not_stop_dispatch() {
    let mut store = test_store();
    let log = Rc::new(RefCell::new(Vec::new()));

    store.subscribe("ui.theme", |_, _| panic!("observer failure"));
    let survivor_log = Rc::clone(&log);
    store.subscribe("ui.theme", move |_, _| {
        survivor_log.borrow_mut().push("survivor");
    });
    let wildcard_log = Rc::clone(&log);
    store.subscribe(WILDCARD, move |_, _| {
        wildcard_log.borrow_mut().push("wildcard");
    });

    // set returns normally despite the panic
    store.set("ui.theme", json!("dark"));

    assert_eq!(*log.borrow(), vec!["survivor", "wildcard"]);
    assert_eq!(store.get("ui.theme"), Some(json!("dark")));
}

#[test]
fn test_unsubscribe_removes_exactly_one_observer() {
    let mut store = test_store();
    let log = Rc::new(RefCell::new(Vec::new()));

    let first_log = Rc::clone(&log);
    let first = store.subscribe("ui.theme", move |_, _| first_log.borrow_mut().push("first"));
    let second_log = Rc::clone(&log);
    store.subscribe("ui.theme", move |_, _| second_log.borrow_mut().push("second"));

    store.unsubscribe(first);
    store.unsubscribe(first); // idempotent

    store.set("ui.theme", json!("dark"));
    assert_eq!(*log.borrow(), vec!["second"]);
}

// ========================================================================
// Deferred re-entrant writes
// ========================================================================

#[test]
fn test_observer_write_is_deferred_until_after_dispatch() {
    let mut store = test_store();
    let log = Rc::new(RefCell::new(Vec::new()));

    let observer_log = Rc::clone(&log);
    store.subscribe(WILDCARD, move |change, _| {
        observer_log.borrow_mut().push(change.path.to_string());
    });
    store.subscribe("editor.content", |_, effects| {
        effects.set("editor.isDirty", json!(true));
    });

    store.set("editor.content", json!("hello"));

    // The queued write ran as its own full dispatch, after the first one
    assert_eq!(*log.borrow(), vec!["editor.content", "editor.isDirty"]);
    assert_eq!(store.get("editor.isDirty"), Some(json!(true)));
}

#[test]
fn test_observer_write_to_same_path_converges() {
    let mut store = test_store();
    let count = Rc::new(RefCell::new(0));

    let observer_count = Rc::clone(&count);
    store.subscribe("find.searchTerm", move |_, effects| {
        *observer_count.borrow_mut() += 1;
        // Queue a normalization of the path being dispatched; the equal-value
        // no-op terminates the chain on the second round
        effects.set("find.searchTerm", json!("normalized"));
    });

    store.set("find.searchTerm", json!("RAW"));

    assert_eq!(store.get("find.searchTerm"), Some(json!("normalized")));
    assert_eq!(*count.borrow(), 2);
}

// ========================================================================
// Reset
// ========================================================================

#[test]
fn test_reset_subtree_restores_initial_value() {
    let mut store = test_store();
    let seen = Rc::new(RefCell::new(Vec::new()));

    store.set("preferences.tabSize", json!(8));

    let observer_seen = Rc::clone(&seen);
    store.subscribe("preferences", move |change, _| {
        observer_seen.borrow_mut().push(change.new_value.clone());
    });

    store.reset(Some("preferences"));

    assert_eq!(store.get("preferences.tabSize"), Some(json!(2)));
    // Observers saw the reset as a normal change
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_reset_whole_tree_notifies_wildcard_once() {
    let mut store = test_store();
    let count = Rc::new(RefCell::new(0));

    store.set("ui.theme", json!("dark"));
    store.set("editor.content", json!("text"));

    let observer_count = Rc::clone(&count);
    store.subscribe(WILDCARD, move |_, _| *observer_count.borrow_mut() += 1);

    store.reset(None);

    assert_eq!(*count.borrow(), 1);
    assert_eq!(store.snapshot(), initial_state());
}

// ========================================================================
// Invalid paths
// ========================================================================

#[test]
fn test_invalid_path_set_is_noop() {
    let mut store = test_store();
    let count = Rc::new(RefCell::new(0));

    let observer_count = Rc::clone(&count);
    store.subscribe(WILDCARD, move |_, _| *observer_count.borrow_mut() += 1);

    let before = store.snapshot();
    store.set("", json!(1));
    store.set("a..b", json!(1));
    store.set(".leading", json!(1));

    assert_eq!(store.snapshot(), before);
    assert_eq!(*count.borrow(), 0);
}

#[test]
fn test_invalid_path_get_returns_none() {
    let store = test_store();
    assert_eq!(store.get(""), None);
    assert_eq!(store.get("a..b"), None);
}

// ========================================================================
// Debounced persistence
// ========================================================================

#[test]
fn test_persist_worthy_set_reaches_adapter_on_flush() {
    let mut store = test_store();

    store.set("ui.theme", json!("dark"));
    assert!(store.flush_pending().unwrap());

    let stored = store.adapter().get("scribe-theme").unwrap();
    assert_eq!(serde_json::from_str::<Value>(&stored).unwrap(), json!("dark"));
}

#[test]
fn test_flush_writes_every_section() {
    let mut store = test_store();

    store.set("preferences.fontSize", json!(18));
    assert!(store.flush_pending().unwrap());

    let preferences = store.adapter().get("scribe-preferences").unwrap();
    let parsed: Value = serde_json::from_str(&preferences).unwrap();
    assert_eq!(parsed["fontSize"], json!(18));
    assert!(store.adapter().get("scribe-theme").is_some());
    assert!(store.adapter().get("scribe-sidebar-pinned").is_some());
}

#[test]
fn test_non_persist_worthy_set_never_flushes() {
    let mut store = test_store();

    store.set("editor.content", json!("hello"));
    assert!(!store.flush_pending().unwrap());
    assert!(store.adapter().get("scribe-theme").is_none());
}

#[test]
fn test_ancestor_write_covers_persist_section() {
    let mut store = test_store();

    store.set(
        "ui",
        json!({ "theme": "sepia", "sidebarOpen": false, "sidebarPinned": true }),
    );
    assert!(store.persist_scheduled());
    assert!(store.flush_pending().unwrap());

    let stored = store.adapter().get("scribe-theme").unwrap();
    assert_eq!(serde_json::from_str::<Value>(&stored).unwrap(), json!("sepia"));
}

#[test]
fn test_flush_now_forces_unarmed_write() {
    let mut store = test_store_with(StoreConfig {
        debounce_ms: 60_000,
        ..StoreConfig::default()
    });

    store.set("ui.theme", json!("dark"));
    // Debounce period far in the future: polling does nothing
    assert!(!store.flush_pending().unwrap());

    store.flush_now().unwrap();
    assert!(store.adapter().get("scribe-theme").is_some());
}

#[test]
fn test_quota_error_keeps_memory_state_authoritative() {
    let config = StoreConfig {
        debounce_ms: 0,
        ..StoreConfig::default()
    };
    let mut store = StateStore::new(config, Box::new(MemoryAdapter::with_quota(4)));

    store.set("ui.theme", json!("dark"));
    let result = store.flush_pending();

    assert!(matches!(result, Err(PersistError::QuotaExceeded)));
    // The in-memory value is untouched by the failed flush
    assert_eq!(store.get("ui.theme"), Some(json!("dark")));
}

#[test]
fn test_load_merges_persisted_sections() {
    let mut adapter = MemoryAdapter::new();
    adapter
        .set("scribe-preferences", "{\"tabSize\":8}")
        .unwrap();
    adapter.set("scribe-theme", "\"dark\"").unwrap();

    let mut store = StateStore::new(
        StoreConfig {
            debounce_ms: 0,
            ..StoreConfig::default()
        },
        Box::new(adapter),
    );
    let seen = Rc::new(RefCell::new(Vec::new()));
    let observer_seen = Rc::clone(&seen);
    store.subscribe(WILDCARD, move |change, _| {
        observer_seen.borrow_mut().push(change.path.to_string());
    });

    store.load();

    assert_eq!(store.get("ui.theme"), Some(json!("dark")));
    assert_eq!(store.get("preferences.tabSize"), Some(json!(8)));
    // Fields absent from the stored payload keep their defaults
    assert_eq!(store.get("preferences.autoSave"), Some(json!(true)));
    // Observers saw the restored values as normal changes
    assert!(seen.borrow().contains(&"preferences".to_string()));
    assert!(seen.borrow().contains(&"ui.theme".to_string()));
    // A load does not immediately write itself back
    assert!(!store.persist_scheduled());
}

#[test]
fn test_load_skips_corrupt_section() {
    let mut adapter = MemoryAdapter::new();
    adapter.set("scribe-theme", "{not json").unwrap();

    let mut store = StateStore::new(
        StoreConfig {
            debounce_ms: 0,
            ..StoreConfig::default()
        },
        Box::new(adapter),
    );
    store.load();

    assert_eq!(store.get("ui.theme"), Some(json!("light")));
}

#[test]
fn test_clear_persisted_removes_section_keys() {
    let mut store = test_store();

    store.set("ui.theme", json!("dark"));
    store.flush_now().unwrap();
    assert!(store.adapter().get("scribe-theme").is_some());

    store.clear_persisted();

    assert!(store.adapter().get("scribe-theme").is_none());
    assert!(store.adapter().get("scribe-preferences").is_none());
    // In-memory state is untouched
    assert_eq!(store.get("ui.theme"), Some(json!("dark")));
}

#[test]
fn test_custom_persist_sections() {
    let config = StoreConfig {
        debounce_ms: 0,
        storage_prefix: "app-".to_string(),
        persist_sections: vec![PersistSection::new("find", "find-options")],
        ..StoreConfig::default()
    };
    let mut store = test_store_with(config);

    store.set("find.caseSensitive", json!(true));
    assert!(store.flush_pending().unwrap());

    let stored = store.adapter().get("app-find-options").unwrap();
    let parsed: Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(parsed["caseSensitive"], json!(true));
}
