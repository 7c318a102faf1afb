//! In-process store for tests and embedding hosts without a filesystem.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{KeyValueStore, byte_len, check_quota};
use crate::config::DEFAULT_STORE_CAPACITY_BYTES;
use crate::error::StorageError;

pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    capacity: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_STORE_CAPACITY_BYTES)
    }

    #[must_use]
    pub fn with_capacity(capacity_bytes: u64) -> Self {
        Self { entries: Mutex::new(HashMap::new()), capacity: AtomicU64::new(capacity_bytes) }
    }

    /// Change the byte budget. Existing entries are kept even if they no
    /// longer fit; only later writes are checked.
    pub fn set_capacity(&self, capacity_bytes: u64) {
        self.capacity.store(capacity_bytes, Ordering::Relaxed);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_size(key: &str, value: &str) -> u64 {
    byte_len(key).saturating_add(byte_len(value))
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        let used_elsewhere: u64 = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| entry_size(k, v))
            .sum();
        check_quota(used_elsewhere, key, value, self.capacity_bytes())?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.lock().keys().cloned().collect())
    }

    fn used_bytes(&self) -> Result<u64, StorageError> {
        Ok(self.entries.lock().iter().map(|(k, v)| entry_size(k, v)).sum())
    }

    fn capacity_bytes(&self) -> u64 {
        self.capacity.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
