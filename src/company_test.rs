#![allow(clippy::float_cmp)]

use std::sync::Arc;

use chrono::Utc;
use invoices::DocumentSnapshot;

use super::*;
use crate::drafts::DraftStatus;
use crate::store::{KeyValueStore, MemoryStore};

fn draft_numbered(number: &str) -> DraftRecord {
    DraftRecord {
        id: format!("draft_{number}"),
        name: number.to_owned(),
        status: DraftStatus::Draft,
        is_auto_save: false,
        data: DocumentSnapshot { invoice_number: number.to_owned(), ..DocumentSnapshot::default() },
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// =============================================================================
// next_invoice_number
// =============================================================================

#[test]
fn first_number_uses_start() {
    assert_eq!(CompanySettings::default().next_invoice_number(&[]), "INV0001");
}

#[test]
fn next_number_follows_highest_matching_draft() {
    let drafts = [draft_numbered("INV0003"), draft_numbered("INV0012"), draft_numbered("INV0007")];
    assert_eq!(CompanySettings::default().next_invoice_number(&drafts), "INV0013");
}

#[test]
fn numbers_with_other_prefix_or_suffix_are_ignored() {
    let drafts = [draft_numbered("ABC0099"), draft_numbered("INV0042x"), draft_numbered("INV")];
    assert_eq!(CompanySettings::default().next_invoice_number(&drafts), "INV0001");
}

#[test]
fn start_number_is_a_floor() {
    let settings = CompanySettings { invoice_start_number: 500, ..CompanySettings::default() };
    let drafts = [draft_numbered("INV0010")];
    assert_eq!(settings.next_invoice_number(&drafts), "INV0500");
}

#[test]
fn empty_prefix_falls_back_to_inv() {
    let settings = CompanySettings { invoice_prefix: String::new(), ..CompanySettings::default() };
    assert_eq!(settings.next_invoice_number(&[]), "INV0001");
}

#[test]
fn numbers_wider_than_padding_are_kept() {
    let drafts = [draft_numbered("INV12345")];
    assert_eq!(CompanySettings::default().next_invoice_number(&drafts), "INV12346");
}

// =============================================================================
// calculate_tax / contact_lines
// =============================================================================

#[test]
fn tax_uses_percent_rate() {
    let settings = CompanySettings { tax_rate: 7.5, ..CompanySettings::default() };
    assert_eq!(settings.calculate_tax(200.0), 15.0);
    assert_eq!(CompanySettings::default().calculate_tax(200.0), 0.0);
}

#[test]
fn contact_lines_skip_empty_fields() {
    let settings = CompanySettings {
        address: "1 Farm Rd".to_owned(),
        email: "sales@example.com".to_owned(),
        ..CompanySettings::default()
    };
    assert_eq!(settings.contact_lines(), vec!["1 Farm Rd".to_owned(), "Email: sales@example.com".to_owned()]);
}

// =============================================================================
// CompanyRepository
// =============================================================================

#[test]
fn open_writes_defaults_in_original_shape() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let repo = CompanyRepository::open(store.clone()).unwrap();
    assert_eq!(repo.get().unwrap().name, "US AGRICOM");

    let value: serde_json::Value = serde_json::from_str(&store.get(COMPANY_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(value["invoicePrefix"], "INV");
    assert_eq!(value["invoiceStartNumber"], 1);
    assert_eq!(value["taxRate"], 0.0);
}

#[test]
fn update_then_reset() {
    let repo = CompanyRepository::open(Arc::new(MemoryStore::new())).unwrap();
    repo.update(|c| {
        c.name = "Prairie Grain".to_owned();
        c.tax_rate = 5.0;
    })
    .unwrap();
    assert_eq!(repo.get().unwrap().name, "Prairie Grain");

    let reset = repo.reset_to_defaults().unwrap();
    assert_eq!(reset, CompanySettings::default());
    assert_eq!(repo.get().unwrap(), CompanySettings::default());
}
