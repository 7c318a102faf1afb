//! Auto-save controller: periodic persistence of the live document into a
//! single reserved draft slot.
//!
//! DESIGN
//! ======
//! A background tokio task wakes every `autoSaveInterval` milliseconds and
//! runs one tick against the controller core. A tick snapshots the document
//! only when the change tracker is dirty, compares the canonical encoding
//! with the last one persisted, and writes the slot when they differ. After
//! each successful write every other auto-save record is pruned, so at most
//! one record carries `isAutoSave = true`.
//!
//! The timer task holds only a weak reference to the core and is aborted on
//! `disable`, on interval changes and when the controller is dropped. Ticks,
//! manual saves and configuration calls serialise on the core lock; edits
//! reach the tracker through atomics and never wait on a save.
//!
//! RESTORE ON START
//! ================
//! `start` looks for an existing auto-save record. When one exists the
//! caller must resolve it with [`RestoreDecision`] before anything else is
//! persisted: ticks defer while the decision is pending.
//!
//! ERROR HANDLING
//! ==============
//! A failed write moves the controller to `Error`, is returned to the caller
//! and logged, and leaves the tracker dirty. The next tick retries. Cleanup
//! failures are logged and otherwise ignored.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::document::DocumentSource;
use crate::drafts::{DRAFTS_KEY, Draft, DraftRecord, DraftRepository, DraftStatus};
use crate::error::{ErrorCode, StorageError};
use crate::settings::SettingsRepository;
use crate::tracker::ChangeTracker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSaveState {
    Idle { enabled: bool },
    Saving,
    Error { code: &'static str, message: String },
}

/// Point-in-time view of the controller, published on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSaveStatus {
    pub state: AutoSaveState,
    pub enabled: bool,
    pub interval_ms: u64,
    pub dirty: bool,
    pub last_save_time: Option<DateTime<Utc>>,
    pub slot_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreDecision {
    /// Load the auto-saved data into the document and keep using its slot.
    Restore,
    /// Keep the record as a regular draft and start with a fresh slot.
    Discard,
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing changed since the last save.
    Clean,
    /// A restore decision is pending.
    Deferred,
    /// The document was dirty but its content matches the last save.
    Unchanged,
    Saved { id: String },
}

fn auto_save_name() -> String {
    format!("Auto-save - {}", Local::now().format("%Y-%m-%d %H:%M:%S"))
}

fn kept_auto_save_name() -> String {
    format!("Auto-saved - {}", Local::now().format("%Y-%m-%d %H:%M:%S"))
}

struct Core {
    drafts: DraftRepository,
    settings: SettingsRepository,
    document: Arc<dyn DocumentSource>,
    tracker: ChangeTracker,
    enabled: bool,
    interval_ms: u64,
    state: AutoSaveState,
    slot_id: Option<String>,
    last_saved: Option<String>,
    last_save_time: Option<DateTime<Utc>>,
    pending_restore: Option<DraftRecord>,
    timer: Option<JoinHandle<()>>,
    status_tx: watch::Sender<AutoSaveStatus>,
}

impl Core {
    fn status(&self) -> AutoSaveStatus {
        AutoSaveStatus {
            state: self.state.clone(),
            enabled: self.enabled,
            interval_ms: self.interval_ms,
            dirty: self.tracker.is_dirty(),
            last_save_time: self.last_save_time,
            slot_id: self.slot_id.clone(),
        }
    }

    fn set_state(&mut self, state: AutoSaveState) {
        self.state = state;
        self.status_tx.send_replace(self.status());
    }

    fn idle(&mut self) {
        self.set_state(AutoSaveState::Idle { enabled: self.enabled });
    }

    fn fail(&mut self, err: StorageError) -> StorageError {
        warn!(error = %err, code = err.error_code(), "auto-save failed; will retry");
        self.set_state(AutoSaveState::Error { code: err.error_code(), message: err.to_string() });
        err
    }

    fn tick(&mut self) -> Result<SaveOutcome, StorageError> {
        if self.pending_restore.is_some() {
            debug!("auto-save deferred until restore decision");
            return Ok(SaveOutcome::Deferred);
        }
        if !self.tracker.is_dirty() {
            return Ok(SaveOutcome::Clean);
        }

        let generation = self.tracker.generation();
        self.set_state(AutoSaveState::Saving);

        let snapshot = self.document.snapshot();
        let encoded = match snapshot.canonical_encoding() {
            Ok(encoded) => encoded,
            Err(source) => return Err(self.fail(StorageError::Encode { key: DRAFTS_KEY.to_owned(), source })),
        };

        if self.last_saved.as_deref() == Some(encoded.as_str()) {
            self.tracker.mark_clean(generation);
            self.idle();
            debug!("auto-save skipped; content unchanged");
            return Ok(SaveOutcome::Unchanged);
        }

        let mut draft = Draft::new(auto_save_name(), DraftStatus::AutoSave, snapshot);
        draft.is_auto_save = true;

        let id = match self.drafts.save(draft, self.slot_id.as_deref()) {
            Ok(id) => id,
            Err(err) => return Err(self.fail(err)),
        };

        self.slot_id = Some(id.clone());
        self.last_saved = Some(encoded);
        self.last_save_time = Some(Utc::now());
        self.tracker.mark_clean(generation);
        self.cleanup(&id);
        self.idle();
        debug!(draft_id = %id, "auto-saved");
        Ok(SaveOutcome::Saved { id })
    }

    /// Delete every auto-save record other than `keep`.
    fn cleanup(&self, keep: &str) {
        let result = self.drafts.load().and_then(|mut storage| {
            let before = storage.drafts.len();
            storage.drafts.retain(|id, record| !record.is_auto_save || id == keep);
            let removed = before - storage.drafts.len();
            if removed > 0 {
                self.drafts.replace(&storage)?;
            }
            Ok(removed)
        });
        match result {
            Ok(0) => {}
            Ok(removed) => info!(removed, keep = %keep, "pruned stale auto-save slots"),
            Err(e) => warn!(error = %e, "auto-save cleanup failed"),
        }
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            debug!("auto-save timer stopped");
        }
    }
}

/// Spawn the periodic tick task. Returns `None` outside a tokio runtime, in
/// which case the host drives [`AutoSaveController::tick`] itself.
fn spawn_timer(core: Weak<Mutex<Core>>, interval_ms: u64) -> Option<JoinHandle<()>> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(interval_ms, "no tokio runtime; auto-save timer not started");
        return None;
    };
    let period = Duration::from_millis(interval_ms);
    info!(interval_ms, "auto-save timer started");
    Some(runtime.spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let Some(core) = core.upgrade() else {
                break;
            };
            if let Err(e) = core.lock().tick() {
                debug!(error = %e, "auto-save tick failed");
            }
        }
    }))
}

pub struct AutoSaveController {
    core: Arc<Mutex<Core>>,
}

impl AutoSaveController {
    /// Load settings, look for an auto-save record to offer for restore, and
    /// start the timer when auto-save is enabled.
    ///
    /// # Errors
    ///
    /// Surfaces failures reading settings or drafts.
    pub fn start(
        drafts: DraftRepository,
        settings: SettingsRepository,
        document: Arc<dyn DocumentSource>,
        tracker: ChangeTracker,
    ) -> Result<Self, StorageError> {
        let current = settings.get()?;
        let pending_restore = drafts.find_auto_save()?;
        if let Some(record) = &pending_restore {
            info!(draft_id = %record.id, updated_at = %record.updated_at, "auto-save record awaiting restore decision");
        }

        let state = AutoSaveState::Idle { enabled: current.auto_save_enabled };
        let initial = AutoSaveStatus {
            state: state.clone(),
            enabled: current.auto_save_enabled,
            interval_ms: current.auto_save_interval,
            dirty: tracker.is_dirty(),
            last_save_time: None,
            slot_id: None,
        };
        let (status_tx, _) = watch::channel(initial);

        let controller = Self {
            core: Arc::new(Mutex::new(Core {
                drafts,
                settings,
                document,
                tracker,
                enabled: current.auto_save_enabled,
                interval_ms: current.auto_save_interval,
                state,
                slot_id: None,
                last_saved: None,
                last_save_time: None,
                pending_restore,
                timer: None,
                status_tx,
            })),
        };
        if current.auto_save_enabled {
            controller.restart_timer();
        }
        Ok(controller)
    }

    fn restart_timer(&self) {
        let mut core = self.core.lock();
        core.stop_timer();
        if core.enabled && core.interval_ms > 0 {
            core.timer = spawn_timer(Arc::downgrade(&self.core), core.interval_ms);
        }
    }

    /// Turn auto-save on and persist the choice.
    ///
    /// # Errors
    ///
    /// Propagates settings write failures; the controller is left unchanged.
    pub fn enable(&self) -> Result<(), StorageError> {
        {
            let mut core = self.core.lock();
            core.settings.update(|s| s.auto_save_enabled = true)?;
            core.enabled = true;
            core.idle();
        }
        self.restart_timer();
        info!("auto-save enabled");
        Ok(())
    }

    /// Turn auto-save off, persist the choice and cancel the timer.
    ///
    /// # Errors
    ///
    /// Propagates settings write failures; the controller is left unchanged.
    pub fn disable(&self) -> Result<(), StorageError> {
        let mut core = self.core.lock();
        core.settings.update(|s| s.auto_save_enabled = false)?;
        core.enabled = false;
        core.stop_timer();
        core.idle();
        info!("auto-save disabled");
        Ok(())
    }

    /// Change the tick period and restart the timer. Zero leaves no timer
    /// scheduled.
    ///
    /// # Errors
    ///
    /// Propagates settings write failures.
    pub fn set_interval(&self, seconds: u64) -> Result<(), StorageError> {
        let interval_ms = seconds.saturating_mul(1000);
        {
            let mut core = self.core.lock();
            core.settings.update(|s| s.auto_save_interval = interval_ms)?;
            core.interval_ms = interval_ms;
            let status = core.status();
            core.status_tx.send_replace(status);
        }
        self.restart_timer();
        info!(interval_ms, "auto-save interval changed");
        Ok(())
    }

    /// Run one tick now: the same path the timer takes.
    ///
    /// # Errors
    ///
    /// Returns the storage failure; the document stays dirty.
    pub fn tick(&self) -> Result<SaveOutcome, StorageError> {
        self.core.lock().tick()
    }

    /// Force a save of the current document, bypassing the dirty check.
    /// Works whether or not auto-save is enabled.
    ///
    /// # Errors
    ///
    /// Returns the storage failure; the document stays dirty.
    pub fn save_now(&self) -> Result<SaveOutcome, StorageError> {
        let mut core = self.core.lock();
        core.tracker.mark_dirty();
        core.tick()
    }

    #[must_use]
    pub fn pending_restore(&self) -> Option<DraftRecord> {
        self.core.lock().pending_restore.clone()
    }

    /// Resolve the restore decision raised at start. Returns the id of the
    /// affected record, or `None` when nothing was pending.
    ///
    /// # Errors
    ///
    /// On a failed discard the decision stays pending.
    pub fn resolve_restore(&self, decision: RestoreDecision) -> Result<Option<String>, StorageError> {
        let mut core = self.core.lock();
        let Some(record) = core.pending_restore.take() else {
            return Ok(None);
        };
        let id = record.id.clone();

        match decision {
            RestoreDecision::Restore => {
                core.document.restore(&record.data);
                core.last_saved = core.document.snapshot().canonical_encoding().ok();
                core.slot_id = Some(id.clone());
                info!(draft_id = %id, "auto-save restored");
            }
            RestoreDecision::Discard => {
                let draft = Draft {
                    name: kept_auto_save_name(),
                    status: DraftStatus::AutoSaved,
                    is_auto_save: false,
                    data: record.data.clone(),
                    created_at: Some(record.created_at),
                };
                if let Err(e) = core.drafts.save(draft, Some(&id)) {
                    core.pending_restore = Some(record);
                    return Err(e);
                }
                info!(draft_id = %id, "auto-save kept as regular draft");
            }
        }
        core.idle();
        Ok(Some(id))
    }

    /// Adopt an existing record as the auto-save slot, e.g. after the user
    /// loads an auto-saved draft into the editor.
    pub fn set_current_slot(&self, id: impl Into<String>) {
        let mut core = self.core.lock();
        let id = id.into();
        debug!(draft_id = %id, "auto-save slot adopted");
        core.slot_id = Some(id);
        core.last_saved = None;
        let status = core.status();
        core.status_tx.send_replace(status);
    }

    #[must_use]
    pub fn status(&self) -> AutoSaveStatus {
        self.core.lock().status()
    }

    /// Receiver that sees every state transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AutoSaveStatus> {
        self.core.lock().status_tx.subscribe()
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.core.lock().timer.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for AutoSaveController {
    fn drop(&mut self) {
        self.core.lock().stop_timer();
    }
}

#[cfg(test)]
#[path = "autosave_test.rs"]
mod tests;
