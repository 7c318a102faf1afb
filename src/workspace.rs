//! Composition root for one editor session.
//!
//! A [`Workspace`] is built once at startup over a single store and handed to
//! the UI layer by reference. It owns the live document, the change tracker,
//! every repository and the auto-save controller, and exposes the actions the
//! editor's buttons invoke.

use std::sync::Arc;

use chrono::Local;
use invoices::{CodecError, Validation, decode_document, encode_document, export_file_name};
use tracing::info;

use crate::autosave::AutoSaveController;
use crate::backup::{self, BackupBundle};
use crate::company::{CompanyRepository, CompanySettings};
use crate::config::StoreConfig;
use crate::document::{Document, SharedDocument};
use crate::drafts::{Draft, DraftRecord, DraftRepository, DraftStatus};
use crate::error::{ErrorCode, StorageError};
use crate::profiles::ProfileRepository;
use crate::settings::SettingsRepository;
use crate::store::SharedStore;
use crate::tracker::ChangeTracker;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid invoice file: {0}")]
    Codec(#[from] CodecError),
    #[error("draft not found: {0}")]
    DraftNotFound(String),
    #[error("company profile not found: {0}")]
    ProfileNotFound(String),
}

impl ErrorCode for WorkspaceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Storage(e) => e.error_code(),
            Self::Codec(_) => "E_INVALID_FILE",
            Self::DraftNotFound(_) => "E_DRAFT_NOT_FOUND",
            Self::ProfileNotFound(_) => "E_PROFILE_NOT_FOUND",
        }
    }
}

/// Whether loading `draft` should make it the auto-save slot again.
fn is_auto_save_draft(draft: &DraftRecord) -> bool {
    draft.is_auto_save || draft.status == DraftStatus::AutoSaved || draft.name.contains("Auto-save")
}

pub struct Workspace {
    document: SharedDocument,
    tracker: ChangeTracker,
    drafts: DraftRepository,
    settings: SettingsRepository,
    company: CompanyRepository,
    profiles: ProfileRepository,
    autosave: AutoSaveController,
}

impl Workspace {
    /// Initialise every record the editor needs and start auto-save. A new
    /// blank invoice dated today becomes the live document.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be initialised or read.
    pub fn open(store: SharedStore) -> Result<Self, WorkspaceError> {
        let drafts = DraftRepository::open(store.clone())?;
        let settings = SettingsRepository::open(store.clone())?;
        let company = CompanyRepository::open(store.clone())?;
        let profiles = ProfileRepository::open(store)?;

        let tracker = ChangeTracker::new();
        let mut document = Document::dated_today();
        document.observe(Arc::new(tracker.clone()));
        let document = SharedDocument::new(document);

        let autosave =
            AutoSaveController::start(drafts.clone(), settings.clone(), Arc::new(document.clone()), tracker.clone())?;
        info!("workspace opened");

        Ok(Self { document, tracker, drafts, settings, company, profiles, autosave })
    }

    /// Open the store described by `config`, then the workspace over it.
    ///
    /// # Errors
    ///
    /// Fails when the store cannot be opened or initialised.
    pub fn from_config(config: &StoreConfig) -> Result<Self, WorkspaceError> {
        Self::open(config.open()?)
    }

    #[must_use]
    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    #[must_use]
    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    #[must_use]
    pub fn drafts(&self) -> &DraftRepository {
        &self.drafts
    }

    #[must_use]
    pub fn settings(&self) -> &SettingsRepository {
        &self.settings
    }

    #[must_use]
    pub fn company(&self) -> &CompanyRepository {
        &self.company
    }

    #[must_use]
    pub fn profiles(&self) -> &ProfileRepository {
        &self.profiles
    }

    #[must_use]
    pub fn autosave(&self) -> &AutoSaveController {
        &self.autosave
    }

    #[must_use]
    pub fn validate(&self) -> Validation {
        self.document.lock().snapshot().validate()
    }

    /// Save the current document as a new named draft. The draft is stored
    /// even when it fails validation; the status records which.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::QuotaExceeded`] when the store is full.
    pub fn save_draft(&self, name: &str) -> Result<String, WorkspaceError> {
        let data = self.document.lock().snapshot();
        let status = if data.validate().is_valid() { DraftStatus::Valid } else { DraftStatus::Draft };
        let name = match name.trim() {
            "" => format!("Invoice - {}", Local::now().format("%Y-%m-%d")),
            trimmed => trimmed.to_owned(),
        };
        let id = self.drafts.save(Draft::new(name, status, data), None)?;
        info!(draft_id = %id, ?status, "draft saved");
        Ok(id)
    }

    /// Replace the live document with a stored draft. Loading an auto-save
    /// draft makes it the auto-save slot so the next tick updates it in
    /// place.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::DraftNotFound`] for an unknown id.
    pub fn load_draft(&self, id: &str) -> Result<DraftRecord, WorkspaceError> {
        let draft = self.drafts.get(id)?.ok_or_else(|| WorkspaceError::DraftNotFound(id.to_owned()))?;
        self.document.lock().restore(&draft.data);
        if is_auto_save_draft(&draft) {
            self.autosave.set_current_slot(draft.id.clone());
        }
        info!(draft_id = %id, "draft loaded");
        Ok(draft)
    }

    /// # Errors
    ///
    /// Returns [`WorkspaceError::DraftNotFound`] for an unknown id.
    pub fn delete_draft(&self, id: &str) -> Result<(), WorkspaceError> {
        if self.drafts.get(id)?.is_none() {
            return Err(WorkspaceError::DraftNotFound(id.to_owned()));
        }
        self.drafts.delete(id)?;
        Ok(())
    }

    /// Current document as delimited text, with its download file name.
    #[must_use]
    pub fn export_csv(&self) -> (String, String) {
        let snapshot = self.document.lock().snapshot();
        (export_file_name(&snapshot), encode_document(&snapshot))
    }

    /// Replace the live document with the contents of a delimited-text file.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::Codec`] when the text cannot be parsed; the
    /// document is left untouched.
    pub fn import_csv(&self, text: &str) -> Result<(), WorkspaceError> {
        let snapshot = decode_document(text)?;
        self.document.lock().load_imported(&snapshot);
        info!(items = snapshot.items.len(), "invoice imported");
        Ok(())
    }

    /// # Errors
    ///
    /// Surfaces read failures.
    pub fn next_invoice_number(&self) -> Result<String, WorkspaceError> {
        Ok(self.company.get()?.next_invoice_number(&self.drafts.list()?))
    }

    /// Give the document an invoice number if it has none yet.
    ///
    /// # Errors
    ///
    /// Surfaces read failures.
    pub fn fill_invoice_number(&self) -> Result<bool, WorkspaceError> {
        let next = self.next_invoice_number()?;
        Ok(self.document.lock().ensure_invoice_number(|| next))
    }

    /// # Errors
    ///
    /// Surfaces a corrupt company record.
    pub fn page_title(&self) -> Result<String, WorkspaceError> {
        let company = self.company.get()?;
        Ok(self.document.lock().page_title(&company.name))
    }

    /// Make a saved company profile the current company settings.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::ProfileNotFound`] for an unknown id.
    pub fn load_profile(&self, id: &str) -> Result<CompanySettings, WorkspaceError> {
        self.profiles
            .load_into(id, &self.company)?
            .ok_or_else(|| WorkspaceError::ProfileNotFound(id.to_owned()))
    }

    /// # Errors
    ///
    /// Propagates read failures and the settings write.
    pub fn export_backup(&self) -> Result<BackupBundle, WorkspaceError> {
        Ok(backup::export(&self.drafts, &self.settings, &self.company)?)
    }

    /// # Errors
    ///
    /// Stops at the first failed write.
    pub fn import_backup(&self, bundle: &BackupBundle) -> Result<(), WorkspaceError> {
        Ok(backup::import(bundle, &self.drafts, &self.settings, &self.company)?)
    }
}

#[cfg(test)]
#[path = "workspace_test.rs"]
mod tests;
