//! Headless invoice editor core.
//!
//! The live [`Document`] notifies a [`ChangeTracker`] on every edit. The
//! [`AutoSaveController`] periodically persists the dirty document into a
//! single reserved draft slot through the [`DraftRepository`], and offers the
//! slot back for restore on the next start. Everything persists through one
//! [`KeyValueStore`]; [`Workspace`] wires the pieces together.
//!
//! The library installs no tracing subscriber; hosts pick one.

pub mod autosave;
pub mod backup;
pub mod company;
pub mod config;
pub mod document;
pub mod drafts;
pub mod error;
pub mod profiles;
pub mod settings;
pub mod store;
pub mod tracker;
pub mod workspace;

pub use autosave::{AutoSaveController, AutoSaveState, AutoSaveStatus, RestoreDecision, SaveOutcome};
pub use config::StoreConfig;
pub use document::{Document, DocumentSource, SharedDocument};
pub use drafts::{Draft, DraftRecord, DraftRepository, DraftStatus};
pub use error::{ErrorCode, StorageError};
pub use store::{FileStore, KeyValueStore, MemoryStore, SharedStore};
pub use tracker::{ChangeTracker, Edit, EditObserver};
pub use workspace::{Workspace, WorkspaceError};

pub use invoices::{DocumentSnapshot, LineItem};
