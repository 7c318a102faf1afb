//! Key-value store abstraction the repositories persist through.
//!
//! SYSTEM CONTEXT
//! ==============
//! Values are JSON text keyed by a short name (`invoice_drafts`,
//! `invoice_settings`, ...), the same layout a browser profile's
//! localStorage holds. Backends enforce a byte capacity so quota failures
//! surface the same way on every platform.

mod file;
mod memory;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Durable string-to-string mapping with a byte budget.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value for `key`, `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace `key`. Fails with [`StorageError::QuotaExceeded`]
    /// when the write would push usage past [`capacity_bytes`](Self::capacity_bytes).
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Bytes currently held, counting keys and values.
    fn used_bytes(&self) -> Result<u64, StorageError>;

    fn capacity_bytes(&self) -> u64;
}

/// A store shared by every repository built at startup.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Load and parse a JSON value stored under `key`.
///
/// # Errors
///
/// Returns [`StorageError::MalformedRecord`] when the stored text does not
/// parse as `T`, plus any backend read error.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::MalformedRecord { key: key.to_owned(), source })
}

/// Serialize `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns [`StorageError::Encode`] if serialization fails, plus any backend
/// write error including [`StorageError::QuotaExceeded`].
pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode { key: key.to_owned(), source })?;
    store.set(key, &raw)
}

pub(crate) fn byte_len(s: &str) -> u64 {
    u64::try_from(s.len()).unwrap_or(u64::MAX)
}

/// Reject a write whose entry would not fit next to `used_elsewhere` bytes.
pub(crate) fn check_quota(used_elsewhere: u64, key: &str, value: &str, capacity: u64) -> Result<(), StorageError> {
    let needed = byte_len(key).saturating_add(byte_len(value));
    let available = capacity.saturating_sub(used_elsewhere);
    if needed > available {
        return Err(StorageError::QuotaExceeded { needed, available });
    }
    Ok(())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
