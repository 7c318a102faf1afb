//! Directory-backed store: one `<key>.json` file per key.
//!
//! Writes go to a temporary sibling and are renamed into place, so a crash
//! mid-write leaves the previous value intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::{KeyValueStore, byte_len, check_quota};
use crate::error::StorageError;

const EXTENSION: &str = "json";

pub struct FileStore {
    dir: PathBuf,
    capacity: u64,
    // Serializes the quota check with the write that follows it.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>, capacity_bytes: u64) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, capacity: capacity_bytes, write_lock: Mutex::new(()) })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }

    fn entry_sizes(&self) -> Result<Vec<(String, u64)>, StorageError> {
        let mut sizes = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_key(key).is_err() {
                continue;
            }
            let len = entry.metadata()?.len();
            sizes.push((key.to_owned(), byte_len(key).saturating_add(len)));
        }
        Ok(sizes)
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid { Ok(()) } else { Err(StorageError::InvalidKey(key.to_owned())) }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock();

        let used_elsewhere: u64 = self
            .entry_sizes()?
            .into_iter()
            .filter(|(k, _)| k != key)
            .map(|(_, size)| size)
            .sum();
        check_quota(used_elsewhere, key, value, self.capacity)?;

        let tmp = self.dir.join(format!(".{key}.{EXTENSION}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entry_sizes()?.into_iter().map(|(key, _)| key).collect())
    }

    fn used_bytes(&self) -> Result<u64, StorageError> {
        Ok(self.entry_sizes()?.into_iter().map(|(_, size)| size).sum())
    }

    fn capacity_bytes(&self) -> u64 {
        self.capacity
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;
