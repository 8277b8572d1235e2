//! Store configuration persistence
//!
//! Stores the knobs consumed (not owned) by the state core in
//! `~/.config/scribe/config.yaml`: history depth, debounce intervals,
//! size limits, and the set of state subtrees mirrored to durable storage.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A state subtree mirrored to durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistSection {
    /// Dotted path of the subtree (e.g. `preferences`, `ui.theme`)
    pub path: String,
    /// Logical storage key, appended to the storage prefix
    pub key: String,
}

impl PersistSection {
    pub fn new(path: &str, key: &str) -> Self {
        Self {
            path: path.to_string(),
            key: key.to_string(),
        }
    }
}

/// Configuration consumed by the state core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum retained undo snapshots (values below 1 are treated as 1)
    pub max_undo_depth: usize,
    /// Quiet period before persist-worthy changes reach durable storage, ms
    pub debounce_ms: u64,
    /// Quiet period before document content autosave, ms
    pub autosave_delay_ms: u64,
    /// Upper bound on committed document size, bytes
    pub max_file_size: usize,
    /// Words per minute used for the reading-time statistic
    pub reading_speed_wpm: usize,
    /// Capacity of the recent documents list
    pub max_recent_files: usize,
    /// Prepended to every storage key
    pub storage_prefix: String,
    /// Subtrees mirrored to durable storage
    pub persist_sections: Vec<PersistSection>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_undo_depth: 100,
            debounce_ms: 1000,
            autosave_delay_ms: 5000,
            max_file_size: 10 * 1024 * 1024,
            reading_speed_wpm: 200,
            max_recent_files: 10,
            storage_prefix: "scribe-".to_string(),
            persist_sections: vec![
                PersistSection::new("preferences", "preferences"),
                PersistSection::new("ui.theme", "theme"),
                PersistSection::new("ui.sidebarPinned", "sidebar-pinned"),
                PersistSection::new("cache.recentFiles", "recent-files"),
            ],
        }
    }
}

impl StoreConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to disk
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<(), String> {
        let path = crate::config_paths::config_file()
            .ok_or_else(|| "No config directory available".to_string())?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(&path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Full storage key for a logical section key
    pub fn storage_key(&self, logical_key: &str) -> String {
        format!("{}{}", self.storage_prefix, logical_key)
    }
}
