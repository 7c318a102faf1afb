//! Named company profiles persisted under `company_profiles`.
//!
//! A profile is a saved copy of [`CompanySettings`] that can later be loaded
//! back as the current settings, so one installation can invoice on behalf of
//! several companies.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::company::{CompanyRepository, CompanySettings};
use crate::drafts::{STORAGE_VERSION, random_suffix};
use crate::error::StorageError;
use crate::store::{SharedStore, load_json, save_json};

pub const PROFILES_KEY: &str = "company_profiles";

const UNNAMED_PROFILE: &str = "Unnamed Company";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    pub id: String,
    pub profile_name: String,
    #[serde(flatten)]
    pub company: CompanySettings,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileStorage {
    pub profiles: HashMap<String, CompanyProfile>,
    pub version: String,
}

impl Default for ProfileStorage {
    fn default() -> Self {
        Self { profiles: HashMap::new(), version: STORAGE_VERSION.to_owned() }
    }
}

/// Generate a profile id: `company_<epoch ms>_<6 base36 chars>`.
#[must_use]
pub fn generate_profile_id() -> String {
    format!("company_{}_{}", Utc::now().timestamp_millis(), random_suffix(6))
}

#[derive(Clone)]
pub struct ProfileRepository {
    store: SharedStore,
}

impl ProfileRepository {
    /// # Errors
    ///
    /// Fails when the empty envelope cannot be written.
    pub fn open(store: SharedStore) -> Result<Self, StorageError> {
        if store.get(PROFILES_KEY)?.is_none() {
            save_json(store.as_ref(), PROFILES_KEY, &ProfileStorage::default())?;
        }
        Ok(Self { store })
    }

    fn load(&self) -> Result<ProfileStorage, StorageError> {
        Ok(load_json(self.store.as_ref(), PROFILES_KEY)?.unwrap_or_default())
    }

    fn replace(&self, storage: &ProfileStorage) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), PROFILES_KEY, storage)
    }

    /// Save `company` as a new profile. The profile is named `profile_name`,
    /// falling back to the company name, then to "Unnamed Company".
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QuotaExceeded`] when the store is full.
    pub fn save(&self, company: &CompanySettings, profile_name: Option<&str>) -> Result<String, StorageError> {
        let mut storage = self.load()?;
        let id = generate_profile_id();
        let name = [profile_name.unwrap_or_default().trim(), company.name.trim()]
            .into_iter()
            .find(|n| !n.is_empty())
            .unwrap_or(UNNAMED_PROFILE)
            .to_owned();

        storage.profiles.insert(
            id.clone(),
            CompanyProfile { id: id.clone(), profile_name: name, company: company.clone(), saved_at: Utc::now() },
        );
        self.replace(&storage)?;
        info!(profile_id = %id, "company profile saved");
        Ok(id)
    }

    /// # Errors
    ///
    /// Surfaces read and parse failures.
    pub fn list(&self) -> Result<Vec<CompanyProfile>, StorageError> {
        Ok(self.load()?.profiles.into_values().collect())
    }

    /// # Errors
    ///
    /// Surfaces read and parse failures.
    pub fn get(&self, id: &str) -> Result<Option<CompanyProfile>, StorageError> {
        Ok(self.load()?.profiles.remove(id))
    }

    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn delete(&self, id: &str) -> Result<(), StorageError> {
        let mut storage = self.load()?;
        if storage.profiles.remove(id).is_some() {
            self.replace(&storage)?;
        }
        Ok(())
    }

    /// Apply `change` to a stored profile and refresh `saved_at`. Returns
    /// `None` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Propagates read and write failures.
    pub fn update(
        &self,
        id: &str,
        change: impl FnOnce(&mut CompanyProfile),
    ) -> Result<Option<CompanyProfile>, StorageError> {
        let mut storage = self.load()?;
        let Some(profile) = storage.profiles.get_mut(id) else {
            return Ok(None);
        };
        change(profile);
        profile.id = id.to_owned();
        profile.saved_at = Utc::now();
        let updated = profile.clone();
        self.replace(&storage)?;
        Ok(Some(updated))
    }

    /// Make a profile's settings the current company settings.
    ///
    /// # Errors
    ///
    /// Propagates read and write failures.
    pub fn load_into(&self, id: &str, company: &CompanyRepository) -> Result<Option<CompanySettings>, StorageError> {
        let Some(profile) = self.get(id)? else {
            return Ok(None);
        };
        company.replace(&profile.company)?;
        info!(profile_id = %id, "company profile loaded");
        Ok(Some(profile.company))
    }
}

#[cfg(test)]
#[path = "profiles_test.rs"]
mod tests;
