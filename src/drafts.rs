//! Draft repository: named, persisted snapshots of the invoice document.
//!
//! DESIGN
//! ======
//! All drafts live under one key (`invoice_drafts`) as
//! `{ drafts: { id -> record }, version }`. Every operation is a
//! read-modify-write of that envelope, so a failed write leaves the previous
//! envelope untouched. Ids never change once assigned; saving with an
//! existing id updates the record in place.
//!
//! ERROR HANDLING
//! ==============
//! `QuotaExceeded` propagates to the caller. Nothing here retries or evicts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use invoices::DocumentSnapshot;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::store::{SharedStore, load_json, save_json};

pub const DRAFTS_KEY: &str = "invoice_drafts";
pub const STORAGE_VERSION: &str = "1.0.0";

const WARNING_PERCENT: f64 = 80.0;
const CRITICAL_PERCENT: f64 = 90.0;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DraftStatus {
    /// Saved manually, failed validation.
    Draft,
    /// Saved manually, passed validation.
    Valid,
    /// Occupies the auto-save slot.
    AutoSave,
    /// A former auto-save slot kept as a regular draft.
    AutoSaved,
}

/// A draft as written by a caller, before the repository stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub name: String,
    pub status: DraftStatus,
    pub is_auto_save: bool,
    pub data: DocumentSnapshot,
    /// Kept when present; otherwise inherited from the stored record.
    pub created_at: Option<DateTime<Utc>>,
}

impl Draft {
    #[must_use]
    pub fn new(name: impl Into<String>, status: DraftStatus, data: DocumentSnapshot) -> Self {
        Self { name: name.into(), status, is_auto_save: false, data, created_at: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub id: String,
    pub name: String,
    pub status: DraftStatus,
    #[serde(default)]
    pub is_auto_save: bool,
    #[serde(default)]
    pub data: DocumentSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DraftRecord> for Draft {
    fn from(record: DraftRecord) -> Self {
        Self {
            name: record.name,
            status: record.status,
            is_auto_save: record.is_auto_save,
            data: record.data,
            created_at: Some(record.created_at),
        }
    }
}

/// Persisted envelope under [`DRAFTS_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftStorage {
    pub drafts: HashMap<String, DraftRecord>,
    pub version: String,
}

impl Default for DraftStorage {
    fn default() -> Self {
        Self { drafts: HashMap::new(), version: STORAGE_VERSION.to_owned() }
    }
}

/// Best-effort estimate of how full the store is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub capacity_bytes: u64,
    pub available_bytes: u64,
    pub percent_used: f64,
    /// Above 80% of capacity.
    pub warning: bool,
    /// Above 90% of capacity.
    pub critical: bool,
}

impl StorageUsage {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(used_bytes: u64, capacity_bytes: u64) -> Self {
        let percent_used = if capacity_bytes == 0 { 100.0 } else { used_bytes as f64 / capacity_bytes as f64 * 100.0 };
        Self {
            used_bytes,
            capacity_bytes,
            available_bytes: capacity_bytes.saturating_sub(used_bytes),
            percent_used,
            warning: percent_used > WARNING_PERCENT,
            critical: percent_used > CRITICAL_PERCENT,
        }
    }
}

/// Generate a draft id: `draft_<epoch ms>_<9 base36 chars>`.
#[must_use]
pub fn generate_draft_id() -> String {
    format!("draft_{}_{}", Utc::now().timestamp_millis(), random_suffix(9))
}

pub(crate) fn random_suffix(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..ID_ALPHABET.len());
            ID_ALPHABET[idx] as char
        })
        .collect()
}

#[derive(Clone)]
pub struct DraftRepository {
    store: SharedStore,
}

impl DraftRepository {
    /// Wrap `store`, writing an empty envelope if none exists yet.
    ///
    /// # Errors
    ///
    /// Fails when the envelope cannot be written.
    pub fn open(store: SharedStore) -> Result<Self, StorageError> {
        if store.get(DRAFTS_KEY)?.is_none() {
            save_json(store.as_ref(), DRAFTS_KEY, &DraftStorage::default())?;
            info!("initialized draft storage");
        }
        Ok(Self { store })
    }

    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Read the whole envelope; a missing key reads as empty.
    ///
    /// # Errors
    ///
    /// Surfaces [`StorageError::MalformedRecord`] when the envelope is corrupt.
    pub fn load(&self) -> Result<DraftStorage, StorageError> {
        Ok(load_json(self.store.as_ref(), DRAFTS_KEY)?.unwrap_or_default())
    }

    /// Replace the whole envelope.
    ///
    /// # Errors
    ///
    /// Propagates backend write errors.
    pub fn replace(&self, storage: &DraftStorage) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), DRAFTS_KEY, storage)
    }

    /// Insert or update a draft and return its id.
    ///
    /// `updated_at` is always stamped. `created_at` comes from the input when
    /// present, else from the stored record with the same id, else now.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QuotaExceeded`] when the store is full.
    pub fn save(&self, draft: Draft, id: Option<&str>) -> Result<String, StorageError> {
        let mut storage = self.load()?;
        let id = id.map_or_else(generate_draft_id, str::to_owned);
        let now = Utc::now();

        let created_at = draft
            .created_at
            .or_else(|| storage.drafts.get(&id).map(|existing| existing.created_at))
            .unwrap_or(now);

        let record = DraftRecord {
            id: id.clone(),
            name: draft.name,
            status: draft.status,
            is_auto_save: draft.is_auto_save,
            data: draft.data,
            created_at,
            updated_at: now,
        };
        storage.drafts.insert(id.clone(), record);
        self.replace(&storage)?;

        debug!(draft_id = %id, "draft saved");
        Ok(id)
    }

    /// # Errors
    ///
    /// Surfaces read and parse failures.
    pub fn get(&self, id: &str) -> Result<Option<DraftRecord>, StorageError> {
        Ok(self.load()?.drafts.remove(id))
    }

    /// All drafts in no particular order.
    ///
    /// # Errors
    ///
    /// Surfaces read and parse failures.
    pub fn list(&self) -> Result<Vec<DraftRecord>, StorageError> {
        Ok(self.load()?.drafts.into_values().collect())
    }

    /// All drafts, most recently updated first.
    ///
    /// # Errors
    ///
    /// Surfaces read and parse failures.
    pub fn list_recent(&self) -> Result<Vec<DraftRecord>, StorageError> {
        let mut drafts = self.list()?;
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(drafts)
    }

    /// Newest record flagged `is_auto_save`, if any.
    ///
    /// # Errors
    ///
    /// Surfaces read and parse failures.
    pub fn find_auto_save(&self) -> Result<Option<DraftRecord>, StorageError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|d| d.is_auto_save)
            .max_by(|a, b| a.updated_at.cmp(&b.updated_at)))
    }

    /// Remove a draft. Absent ids are a no-op.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn delete(&self, id: &str) -> Result<(), StorageError> {
        let mut storage = self.load()?;
        if storage.drafts.remove(id).is_none() {
            return Ok(());
        }
        self.replace(&storage)?;
        debug!(draft_id = %id, "draft deleted");
        Ok(())
    }

    /// Remove every draft.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut storage = self.load()?;
        let count = storage.drafts.len();
        storage.drafts.clear();
        self.replace(&storage)?;
        info!(count, "all drafts cleared");
        Ok(())
    }

    /// # Errors
    ///
    /// Propagates backend errors while measuring.
    pub fn usage_info(&self) -> Result<StorageUsage, StorageError> {
        Ok(StorageUsage::new(self.store.used_bytes()?, self.store.capacity_bytes()))
    }
}

#[cfg(test)]
#[path = "drafts_test.rs"]
mod tests;
