//! Live invoice document: header fields, item rows, and derived totals.
//!
//! This is the in-memory state the editor UI binds to. Every mutating method
//! notifies registered [`EditObserver`]s, which is how the change tracker
//! learns about edits without depending on any UI toolkit. Reading and
//! writing `DocumentSnapshot`s is the serializer half of the persistence
//! path.

use std::sync::Arc;

use chrono::Local;
use invoices::{DocumentSnapshot, LineItem, format_amount, parse_amount};
use parking_lot::{Mutex, MutexGuard};

use crate::tracker::{Column, Edit, EditObserver, HeaderField};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("row {row} out of range ({rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },
}

impl crate::error::ErrorCode for DocumentError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RowOutOfRange { .. } => "E_ROW_OUT_OF_RANGE",
        }
    }
}

fn empty_row() -> LineItem {
    LineItem { total: format_amount(0.0), ..LineItem::default() }
}

fn row_total(row: &LineItem) -> String {
    format_amount(parse_amount(&row.quantity) * parse_amount(&row.price))
}

pub struct Document {
    invoice_date: String,
    invoice_number: String,
    sold_to: String,
    consigned_to: String,
    rows: Vec<LineItem>,
    grand_total: String,
    observers: Vec<Arc<dyn EditObserver>>,
}

impl Document {
    /// A blank invoice with one empty row.
    #[must_use]
    pub fn new() -> Self {
        Self {
            invoice_date: String::new(),
            invoice_number: String::new(),
            sold_to: String::new(),
            consigned_to: String::new(),
            rows: vec![empty_row()],
            grand_total: format_amount(0.0),
            observers: Vec::new(),
        }
    }

    /// A blank invoice dated today (local time, `YYYY-MM-DD`).
    #[must_use]
    pub fn dated_today() -> Self {
        let mut doc = Self::new();
        doc.invoice_date = Local::now().format("%Y-%m-%d").to_string();
        doc
    }

    pub fn observe(&mut self, observer: Arc<dyn EditObserver>) {
        self.observers.push(observer);
    }

    fn notify(&self, edit: Edit) {
        for observer in &self.observers {
            observer.on_edit(&edit);
        }
    }

    #[must_use]
    pub fn header(&self, field: HeaderField) -> &str {
        match field {
            HeaderField::InvoiceDate => &self.invoice_date,
            HeaderField::InvoiceNumber => &self.invoice_number,
            HeaderField::SoldTo => &self.sold_to,
            HeaderField::ConsignedTo => &self.consigned_to,
        }
    }

    pub fn set_header(&mut self, field: HeaderField, value: impl Into<String>) {
        let slot = match field {
            HeaderField::InvoiceDate => &mut self.invoice_date,
            HeaderField::InvoiceNumber => &mut self.invoice_number,
            HeaderField::SoldTo => &mut self.sold_to,
            HeaderField::ConsignedTo => &mut self.consigned_to,
        };
        *slot = value.into();
        self.notify(Edit::Header(field));
    }

    /// Fill the invoice number from `generate` if it is still empty, as the
    /// form does when the number field first gains focus.
    pub fn ensure_invoice_number(&mut self, generate: impl FnOnce() -> String) -> bool {
        if !self.invoice_number.is_empty() {
            return false;
        }
        self.set_header(HeaderField::InvoiceNumber, generate());
        true
    }

    #[must_use]
    pub fn rows(&self) -> &[LineItem] {
        &self.rows
    }

    #[must_use]
    pub fn grand_total(&self) -> &str {
        &self.grand_total
    }

    /// Edit one cell. Quantity and price edits recompute the row total and
    /// grand total. Typing into the last row appends a fresh empty row.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::RowOutOfRange`] for a missing row.
    pub fn set_cell(&mut self, row: usize, column: Column, value: impl Into<String>) -> Result<(), DocumentError> {
        let rows = self.rows.len();
        let item = self.rows.get_mut(row).ok_or(DocumentError::RowOutOfRange { row, rows })?;

        let slot = match column {
            Column::Quantity => &mut item.quantity,
            Column::Unit => &mut item.unit,
            Column::Description => &mut item.description,
            Column::Price => &mut item.price,
        };
        *slot = value.into();

        if matches!(column, Column::Quantity | Column::Price) {
            item.total = row_total(item);
            self.recalculate_grand_total();
        }
        self.notify(Edit::Cell { row, column });

        if row + 1 == self.rows.len() && self.rows[row].has_content() {
            self.add_row();
        }
        Ok(())
    }

    /// Append an empty row and return its index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(empty_row());
        let idx = self.rows.len() - 1;
        self.notify(Edit::RowInserted(idx));
        idx
    }

    /// Remove the last row unless it is the only one.
    pub fn remove_last_row(&mut self) -> bool {
        if self.rows.len() <= 1 {
            return false;
        }
        self.rows.pop();
        self.recalculate_grand_total();
        self.notify(Edit::RowRemoved(self.rows.len()));
        true
    }

    /// Remove the row at `row` unless it is the only one.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::RowOutOfRange`] for a missing row.
    pub fn remove_row(&mut self, row: usize) -> Result<bool, DocumentError> {
        let rows = self.rows.len();
        if row >= rows {
            return Err(DocumentError::RowOutOfRange { row, rows });
        }
        if rows <= 1 {
            return Ok(false);
        }
        self.rows.remove(row);
        self.recalculate_grand_total();
        self.notify(Edit::RowRemoved(row));
        Ok(true)
    }

    fn recalculate_grand_total(&mut self) {
        let sum: f64 = self.rows.iter().map(|r| parse_amount(&r.total)).sum();
        self.grand_total = format_amount(sum);
    }

    /// Plain-data copy of the form. Rows without user-entered content are
    /// left out.
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            invoice_date: self.invoice_date.clone(),
            invoice_number: self.invoice_number.clone(),
            sold_to: self.sold_to.clone(),
            consigned_to: self.consigned_to.clone(),
            items: self.rows.iter().filter(|r| r.has_content()).cloned().collect(),
            grand_total: self.grand_total.clone(),
        }
    }

    /// Replace the form with a saved snapshot. Row totals are kept as saved;
    /// an empty item list leaves one empty row.
    pub fn restore(&mut self, snapshot: &DocumentSnapshot) {
        self.replace_header(snapshot);
        self.rows = snapshot.items.clone();
        if self.rows.is_empty() {
            self.rows.push(empty_row());
        }
        self.recalculate_grand_total();
        self.notify(Edit::Replaced);
    }

    /// Replace the form with imported data: row totals are recomputed and an
    /// empty row is appended for further entry.
    pub fn load_imported(&mut self, snapshot: &DocumentSnapshot) {
        self.replace_header(snapshot);
        self.rows = snapshot
            .items
            .iter()
            .map(|item| LineItem { total: row_total(item), ..item.clone() })
            .collect();
        self.rows.push(empty_row());
        self.recalculate_grand_total();
        self.notify(Edit::Replaced);
    }

    fn replace_header(&mut self, snapshot: &DocumentSnapshot) {
        self.invoice_date.clone_from(&snapshot.invoice_date);
        self.invoice_number.clone_from(&snapshot.invoice_number);
        self.sold_to.clone_from(&snapshot.sold_to);
        self.consigned_to.clone_from(&snapshot.consigned_to);
    }

    #[must_use]
    pub fn page_title(&self, company_name: &str) -> String {
        if self.invoice_number.is_empty() {
            format!("{company_name} Invoice Template")
        } else {
            format!("Invoice {} - {company_name}", self.invoice_number)
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the auto-save controller reads the live document from and restores
/// it into.
pub trait DocumentSource: Send + Sync + 'static {
    fn snapshot(&self) -> DocumentSnapshot;
    fn restore(&self, snapshot: &DocumentSnapshot);
}

/// The live document behind a lock, shared by the editor and the auto-save
/// task.
#[derive(Clone, Default)]
pub struct SharedDocument {
    inner: Arc<Mutex<Document>>,
}

impl SharedDocument {
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self { inner: Arc::new(Mutex::new(document)) }
    }

    pub fn lock(&self) -> MutexGuard<'_, Document> {
        self.inner.lock()
    }
}

impl DocumentSource for SharedDocument {
    fn snapshot(&self) -> DocumentSnapshot {
        self.lock().snapshot()
    }

    fn restore(&self, snapshot: &DocumentSnapshot) {
        self.lock().restore(snapshot);
    }
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
