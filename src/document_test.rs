use std::sync::Arc;

use super::*;
use crate::tracker::ChangeTracker;

fn tracked() -> (Document, ChangeTracker) {
    let tracker = ChangeTracker::new();
    let mut doc = Document::new();
    doc.observe(Arc::new(tracker.clone()));
    (doc, tracker)
}

fn item(quantity: &str, description: &str, price: &str, total: &str) -> LineItem {
    LineItem {
        quantity: quantity.to_owned(),
        unit: "bu".to_owned(),
        description: description.to_owned(),
        price: price.to_owned(),
        total: total.to_owned(),
    }
}

// =============================================================================
// Editing
// =============================================================================

#[test]
fn new_document_has_one_empty_row() {
    let doc = Document::new();
    assert_eq!(doc.rows().len(), 1);
    assert_eq!(doc.rows()[0].total, "$0.00");
    assert_eq!(doc.grand_total(), "$0.00");
}

#[test]
fn dated_today_sets_iso_date() {
    let doc = Document::dated_today();
    let date = doc.header(HeaderField::InvoiceDate);
    assert_eq!(date.len(), 10);
    assert_eq!(&date[4..5], "-");
}

#[test]
fn header_edit_marks_dirty() {
    let (mut doc, tracker) = tracked();
    doc.set_header(HeaderField::SoldTo, "Farmer Co");
    assert_eq!(doc.header(HeaderField::SoldTo), "Farmer Co");
    assert!(tracker.is_dirty());
}

#[test]
fn quantity_and_price_compute_totals() {
    let (mut doc, _) = tracked();
    doc.set_cell(0, Column::Quantity, "10").unwrap();
    doc.set_cell(0, Column::Price, "2.5").unwrap();
    assert_eq!(doc.rows()[0].total, "$25.00");
    assert_eq!(doc.grand_total(), "$25.00");

    doc.set_cell(1, Column::Quantity, "3").unwrap();
    doc.set_cell(1, Column::Price, "$1.10").unwrap();
    assert_eq!(doc.rows()[1].total, "$3.30");
    assert_eq!(doc.grand_total(), "$28.30");
}

#[test]
fn typing_into_last_row_appends_empty_row() {
    let (mut doc, _) = tracked();
    doc.set_cell(0, Column::Description, "Corn").unwrap();
    assert_eq!(doc.rows().len(), 2);
    assert!(!doc.rows()[1].has_content());

    doc.set_cell(0, Column::Unit, "bu").unwrap();
    assert_eq!(doc.rows().len(), 2);
}

#[test]
fn set_cell_out_of_range_errors() {
    let (mut doc, tracker) = tracked();
    let err = doc.set_cell(4, Column::Unit, "x").unwrap_err();
    assert_eq!(err, DocumentError::RowOutOfRange { row: 4, rows: 1 });
    assert!(!tracker.is_dirty());
}

#[test]
fn last_remaining_row_is_never_removed() {
    let (mut doc, _) = tracked();
    assert!(!doc.remove_last_row());
    assert!(!doc.remove_row(0).unwrap());
    assert_eq!(doc.rows().len(), 1);
}

#[test]
fn removing_rows_updates_grand_total() {
    let (mut doc, tracker) = tracked();
    doc.set_cell(0, Column::Quantity, "2").unwrap();
    doc.set_cell(0, Column::Price, "5").unwrap();
    doc.set_cell(1, Column::Quantity, "1").unwrap();
    doc.set_cell(1, Column::Price, "1").unwrap();
    assert_eq!(doc.grand_total(), "$11.00");

    tracker.mark_clean(tracker.generation());
    assert!(doc.remove_row(0).unwrap());
    assert_eq!(doc.grand_total(), "$1.00");
    assert!(tracker.is_dirty());

    assert!(doc.remove_row(9).is_err());
}

#[test]
fn ensure_invoice_number_only_fills_blank() {
    let mut doc = Document::new();
    assert!(doc.ensure_invoice_number(|| "INV0001".to_owned()));
    assert!(!doc.ensure_invoice_number(|| "INV0002".to_owned()));
    assert_eq!(doc.header(HeaderField::InvoiceNumber), "INV0001");
}

#[test]
fn page_title_follows_invoice_number() {
    let mut doc = Document::new();
    assert_eq!(doc.page_title("US AGRICOM"), "US AGRICOM Invoice Template");
    doc.set_header(HeaderField::InvoiceNumber, "INV0007");
    assert_eq!(doc.page_title("US AGRICOM"), "Invoice INV0007 - US AGRICOM");
}

// =============================================================================
// Snapshot / restore
// =============================================================================

#[test]
fn snapshot_skips_rows_without_content() {
    let (mut doc, _) = tracked();
    doc.set_header(HeaderField::InvoiceNumber, "INV-1");
    doc.set_cell(0, Column::Quantity, "4").unwrap();
    doc.set_cell(0, Column::Price, "2").unwrap();

    let snap = doc.snapshot();
    assert_eq!(doc.rows().len(), 2);
    assert_eq!(snap.items.len(), 1);
    assert_eq!(snap.items[0].total, "$8.00");
    assert_eq!(snap.grand_total, "$8.00");
    assert_eq!(snap.invoice_number, "INV-1");
}

#[test]
fn restore_reproduces_snapshot() {
    let snap = DocumentSnapshot {
        invoice_date: "2024-03-01".to_owned(),
        invoice_number: "INV-9".to_owned(),
        sold_to: "Farmer Co\nRoute 1".to_owned(),
        consigned_to: String::new(),
        items: vec![item("10", "Corn", "2.50", "$25.00"), item("1", "Oats", "3", "$3.00")],
        grand_total: "$28.00".to_owned(),
    };
    let (mut doc, tracker) = tracked();
    doc.set_header(HeaderField::ConsignedTo, "old value");
    tracker.mark_clean(tracker.generation());

    doc.restore(&snap);
    assert_eq!(doc.snapshot(), snap);
    assert!(tracker.is_dirty());
}

#[test]
fn restore_keeps_saved_row_totals() {
    let snap = DocumentSnapshot { items: vec![item("10", "Corn", "2", "$19.99")], ..DocumentSnapshot::default() };
    let mut doc = Document::new();
    doc.restore(&snap);
    assert_eq!(doc.rows()[0].total, "$19.99");
    assert_eq!(doc.grand_total(), "$19.99");
}

#[test]
fn restore_without_items_leaves_one_empty_row() {
    let mut doc = Document::new();
    doc.set_cell(0, Column::Description, "Corn").unwrap();
    doc.restore(&DocumentSnapshot::default());
    assert_eq!(doc.rows().len(), 1);
    assert!(!doc.rows()[0].has_content());
    assert_eq!(doc.grand_total(), "$0.00");
}

#[test]
fn load_imported_recomputes_totals_and_appends_row() {
    let snap = DocumentSnapshot { items: vec![item("10", "Corn", "2", "")], ..DocumentSnapshot::default() };
    let mut doc = Document::new();
    doc.load_imported(&snap);
    assert_eq!(doc.rows().len(), 2);
    assert_eq!(doc.rows()[0].total, "$20.00");
    assert_eq!(doc.grand_total(), "$20.00");
}

#[test]
fn shared_document_is_a_document_source() {
    let shared = SharedDocument::default();
    shared.lock().set_header(HeaderField::SoldTo, "A");
    let source: &dyn DocumentSource = &shared;
    let snap = source.snapshot();
    assert_eq!(snap.sold_to, "A");

    let other = SharedDocument::new(Document::new());
    other.restore(&snap);
    assert_eq!(other.lock().header(HeaderField::SoldTo), "A");
}
