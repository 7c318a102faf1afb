//! Auto-save settings persisted under `invoice_settings`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::default_autosave_interval_ms;
use crate::error::StorageError;
use crate::store::{SharedStore, load_json, save_json};

pub const SETTINGS_KEY: &str = "invoice_settings";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSettings {
    #[serde(default = "default_enabled")]
    pub auto_save_enabled: bool,
    /// Milliseconds between auto-save ticks.
    #[serde(default = "default_autosave_interval_ms")]
    pub auto_save_interval: u64,
    #[serde(default)]
    pub last_backup_date: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        Self {
            auto_save_enabled: default_enabled(),
            auto_save_interval: default_autosave_interval_ms(),
            last_backup_date: None,
        }
    }
}

#[derive(Clone)]
pub struct SettingsRepository {
    store: SharedStore,
}

impl SettingsRepository {
    /// Wrap `store`, writing default settings if none exist yet.
    ///
    /// # Errors
    ///
    /// Fails when the defaults cannot be written.
    pub fn open(store: SharedStore) -> Result<Self, StorageError> {
        if store.get(SETTINGS_KEY)?.is_none() {
            save_json(store.as_ref(), SETTINGS_KEY, &InvoiceSettings::default())?;
        }
        Ok(Self { store })
    }

    /// Current settings; defaults when the key is missing.
    ///
    /// # Errors
    ///
    /// Surfaces a corrupt settings record.
    pub fn get(&self) -> Result<InvoiceSettings, StorageError> {
        Ok(load_json(self.store.as_ref(), SETTINGS_KEY)?.unwrap_or_default())
    }

    /// Apply `change` to the current settings and persist the result.
    ///
    /// # Errors
    ///
    /// Propagates read and write failures.
    pub fn update(&self, change: impl FnOnce(&mut InvoiceSettings)) -> Result<InvoiceSettings, StorageError> {
        let mut settings = self.get()?;
        change(&mut settings);
        self.replace(&settings)?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// Propagates backend write errors.
    pub fn replace(&self, settings: &InvoiceSettings) -> Result<(), StorageError> {
        save_json(self.store.as_ref(), SETTINGS_KEY, settings)
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
