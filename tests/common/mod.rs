//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use scribe::config::StoreConfig;
use scribe::persist::MemoryAdapter;
use scribe::session::EditorSession;
use scribe::store::StateStore;

/// Config with zero debounce intervals so flushes fire on the first poll
pub fn test_config() -> StoreConfig {
    StoreConfig {
        debounce_ms: 0,
        autosave_delay_ms: 0,
        ..StoreConfig::default()
    }
}

/// Store backed by an in-memory adapter
pub fn test_store() -> StateStore {
    StateStore::new(test_config(), Box::new(MemoryAdapter::new()))
}

/// Store with a custom config, backed by an in-memory adapter
pub fn test_store_with(config: StoreConfig) -> StateStore {
    StateStore::new(config, Box::new(MemoryAdapter::new()))
}

/// Session over a fresh in-memory store
pub fn test_session() -> EditorSession {
    EditorSession::new(test_store())
}
