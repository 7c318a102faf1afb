//! Environment-driven defaults.
//!
//! These seed the store and the settings record the first time they are
//! created. Once `invoice_settings` exists, the persisted values win.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::error::StorageError;
use crate::store::{FileStore, MemoryStore, SharedStore};

/// Typical browser localStorage budget per origin.
pub const DEFAULT_STORE_CAPACITY_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_AUTOSAVE_INTERVAL_MS: u64 = 30_000;

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Where drafts live and how much room they get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory for the file-backed store; in-memory when absent.
    pub data_dir: Option<PathBuf>,
    pub capacity_bytes: u64,
}

impl StoreConfig {
    /// Read `FAKTU_DATA_DIR` and `FAKTU_STORE_CAPACITY_BYTES`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var_os("FAKTU_DATA_DIR").map(PathBuf::from),
            capacity_bytes: env_parse("FAKTU_STORE_CAPACITY_BYTES", DEFAULT_STORE_CAPACITY_BYTES),
        }
    }

    /// Open the configured store.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the data directory cannot be created.
    pub fn open(&self) -> Result<SharedStore, StorageError> {
        match &self.data_dir {
            Some(dir) => {
                info!(dir = %dir.display(), capacity_bytes = self.capacity_bytes, "opening file store");
                Ok(Arc::new(FileStore::open(dir, self.capacity_bytes)?))
            }
            None => {
                info!(capacity_bytes = self.capacity_bytes, "opening in-memory store");
                Ok(Arc::new(MemoryStore::with_capacity(self.capacity_bytes)))
            }
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { data_dir: None, capacity_bytes: DEFAULT_STORE_CAPACITY_BYTES }
    }
}

/// Auto-save interval used when no settings record exists yet.
#[must_use]
pub fn default_autosave_interval_ms() -> u64 {
    env_parse("FAKTU_AUTOSAVE_INTERVAL_MS", DEFAULT_AUTOSAVE_INTERVAL_MS)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
