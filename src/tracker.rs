//! Change tracking for the live document.
//!
//! DESIGN
//! ======
//! The document calls [`EditObserver::on_edit`] on every mutating
//! operation; the tracker bumps an edit generation. Persisting code reads the
//! generation before snapshotting and, after a successful write, marks only
//! that generation clean. An edit that lands between snapshot and write keeps
//! the tracker dirty, so real edits are never lost. Spurious edits (a restore
//! that rewrites identical content) are fine: the auto-save controller does
//! the authoritative content comparison.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Header fields of the invoice form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    InvoiceDate,
    InvoiceNumber,
    SoldTo,
    ConsignedTo,
}

/// Editable columns of an item row. The total column is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Quantity,
    Unit,
    Description,
    Price,
}

/// A mutating operation on the live document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Header(HeaderField),
    Cell { row: usize, column: Column },
    RowInserted(usize),
    RowRemoved(usize),
    /// The whole document was replaced (restore or import).
    Replaced,
}

/// Receives a notification for every edit the document applies.
pub trait EditObserver: Send + Sync {
    fn on_edit(&self, edit: &Edit);
}

/// Dirty flag keyed by edit generation. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    inner: Arc<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    generation: AtomicU64,
    clean_generation: AtomicU64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.generation() != self.inner.clean_generation.load(Ordering::Acquire)
    }

    /// Current edit generation; pass it to [`mark_clean`](Self::mark_clean)
    /// once the content read at this generation is durable.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Record that everything up to `generation` is persisted. Later edits
    /// keep the tracker dirty.
    pub fn mark_clean(&self, generation: u64) {
        self.inner.clean_generation.fetch_max(generation, Ordering::AcqRel);
    }
}

impl EditObserver for ChangeTracker {
    fn on_edit(&self, _edit: &Edit) {
        self.mark_dirty();
    }
}

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tests;
