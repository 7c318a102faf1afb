//! Whole-store backup bundle.
//!
//! A bundle carries the draft envelope, the auto-save settings and the
//! company settings. Import writes only the sections that are present;
//! sections are written one key at a time, so a failure part way leaves the
//! earlier sections replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::company::{CompanyRepository, CompanySettings};
use crate::drafts::{DraftRepository, DraftStorage};
use crate::error::StorageError;
use crate::settings::{InvoiceSettings, SettingsRepository};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupBundle {
    #[serde(default)]
    pub storage: Option<DraftStorage>,
    #[serde(default)]
    pub settings: Option<InvoiceSettings>,
    #[serde(default)]
    pub company: Option<CompanySettings>,
    pub export_date: DateTime<Utc>,
}

/// Collect every section into a bundle and record the export time as
/// `lastBackupDate`.
///
/// # Errors
///
/// Propagates read failures and the settings write.
pub fn export(
    drafts: &DraftRepository,
    settings: &SettingsRepository,
    company: &CompanyRepository,
) -> Result<BackupBundle, StorageError> {
    let export_date = Utc::now();
    let settings = settings.update(|s| s.last_backup_date = Some(export_date))?;
    let storage = drafts.load()?;
    info!(drafts = storage.drafts.len(), "backup exported");
    Ok(BackupBundle { storage: Some(storage), settings: Some(settings), company: Some(company.get()?), export_date })
}

/// Replace each section present in `bundle`.
///
/// # Errors
///
/// Stops at the first failed write.
pub fn import(
    bundle: &BackupBundle,
    drafts: &DraftRepository,
    settings: &SettingsRepository,
    company: &CompanyRepository,
) -> Result<(), StorageError> {
    if let Some(storage) = &bundle.storage {
        drafts.replace(storage)?;
    }
    if let Some(value) = &bundle.settings {
        settings.replace(value)?;
    }
    if let Some(value) = &bundle.company {
        company.replace(value)?;
    }
    info!(export_date = %bundle.export_date, "backup imported");
    Ok(())
}

#[cfg(test)]
#[path = "backup_test.rs"]
mod tests;
