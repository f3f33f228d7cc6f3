//! Configuration: serde types, TOML loading, validation, and live reload.
//!
//! Every field has a default so an empty (or missing) config file is valid.
//! The daemon shares one [`ConfigHandle`]; modes snapshot the `Arc<Config>`
//! at activation so a reload never changes semantics mid-mode.

mod loader;
mod types;
mod watcher;

pub use loader::{default_config_path, ConfigLoader};
pub use types::{
    ActionConfig, Config, ExclusionsConfig, GeneralConfig, GridConfig, HintsConfig,
    HotkeysConfig, RecursiveGridConfig, ScrollConfig,
};
pub use watcher::{ConfigEvent, ConfigWatcher};

use std::sync::Arc;

use parking_lot::RwLock;

/// Shared, swappable handle to the current configuration.
///
/// Readers clone the inner `Arc` and keep using their snapshot; a reload
/// swaps the `Arc` without disturbing snapshots already taken.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<Config>>>,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Snapshot of the current config.
    pub fn get(&self) -> Arc<Config> {
        self.inner.read().clone()
    }

    /// Replace the current config. Existing snapshots are unaffected.
    pub fn swap(&self, config: Config) {
        *self.inner.write() = Arc::new(config);
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
