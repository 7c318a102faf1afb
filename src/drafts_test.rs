#![allow(clippy::float_cmp)]

use std::sync::Arc;

use invoices::LineItem;

use super::*;
use crate::store::{KeyValueStore, MemoryStore};

fn repo() -> DraftRepository {
    DraftRepository::open(Arc::new(MemoryStore::new())).unwrap()
}

fn snapshot(number: &str) -> DocumentSnapshot {
    DocumentSnapshot {
        invoice_number: number.to_owned(),
        items: vec![LineItem {
            quantity: "5".to_owned(),
            unit: "kg".to_owned(),
            description: "Wheat".to_owned(),
            price: "12.50".to_owned(),
            total: "$62.50".to_owned(),
        }],
        ..DocumentSnapshot::default()
    }
}

// =============================================================================
// open
// =============================================================================

#[test]
fn open_writes_empty_versioned_envelope() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    DraftRepository::open(store.clone()).unwrap();
    let raw = store.get(DRAFTS_KEY).unwrap().expect("envelope written");
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["version"], "1.0.0");
    assert!(value["drafts"].as_object().unwrap().is_empty());
}

#[test]
fn open_keeps_existing_envelope() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let first = DraftRepository::open(store.clone()).unwrap();
    first.save(Draft::new("Keep me", DraftStatus::Draft, snapshot("1")), None).unwrap();
    let second = DraftRepository::open(store).unwrap();
    assert_eq!(second.list().unwrap().len(), 1);
}

// =============================================================================
// save / get
// =============================================================================

#[test]
fn save_without_id_generates_prefixed_id() {
    let repo = repo();
    let id = repo.save(Draft::new("First", DraftStatus::Draft, snapshot("1")), None).unwrap();
    assert!(id.starts_with("draft_"));
    let suffix = id.rsplit('_').next().unwrap();
    assert_eq!(suffix.len(), 9);
}

#[test]
fn save_with_existing_id_updates_in_place() {
    let repo = repo();
    let id = repo.save(Draft::new("First", DraftStatus::Draft, snapshot("1")), None).unwrap();
    let again = repo.save(Draft::new("Renamed", DraftStatus::Valid, snapshot("2")), Some(&id)).unwrap();
    assert_eq!(again, id);

    let drafts = repo.list().unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].name, "Renamed");
    assert_eq!(drafts[0].status, DraftStatus::Valid);
    assert_eq!(drafts[0].data.invoice_number, "2");
}

#[test]
fn created_at_survives_updates_and_updated_at_advances() {
    let repo = repo();
    let id = repo.save(Draft::new("First", DraftStatus::Draft, snapshot("1")), None).unwrap();
    let before = repo.get(&id).unwrap().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    repo.save(Draft::new("Second", DraftStatus::Draft, snapshot("1")), Some(&id)).unwrap();
    let after = repo.get(&id).unwrap().unwrap();

    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at > before.updated_at);
}

#[test]
fn explicit_created_at_is_kept() {
    let repo = repo();
    let stamp = "2020-01-02T03:04:05Z".parse::<DateTime<Utc>>().unwrap();
    let draft = Draft { created_at: Some(stamp), ..Draft::new("Old", DraftStatus::Draft, snapshot("1")) };
    let id = repo.save(draft, None).unwrap();
    assert_eq!(repo.get(&id).unwrap().unwrap().created_at, stamp);
}

#[test]
fn get_absent_id_is_none() {
    assert!(repo().get("draft_missing").unwrap().is_none());
}

#[test]
fn saved_snapshot_round_trips_field_values() {
    let repo = repo();
    let id = repo.save(Draft::new("Wheat", DraftStatus::Valid, snapshot("INV0001")), None).unwrap();
    let item = &repo.get(&id).unwrap().unwrap().data.items[0];
    assert_eq!(item.quantity, "5");
    assert_eq!(item.unit, "kg");
    assert_eq!(item.description, "Wheat");
    assert_eq!(item.price, "12.50");
}

#[test]
fn record_json_uses_original_field_names() {
    let repo = repo();
    let mut draft = Draft::new("Auto", DraftStatus::AutoSave, snapshot("1"));
    draft.is_auto_save = true;
    repo.save(draft, Some("draft_1_abc")).unwrap();

    let raw = repo.store().get(DRAFTS_KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &value["drafts"]["draft_1_abc"];
    assert_eq!(record["status"], "auto-save");
    assert_eq!(record["isAutoSave"], true);
    assert!(record["createdAt"].is_string());
    assert!(record["updatedAt"].is_string());
    assert_eq!(record["data"]["invoiceNumber"], "1");
}

#[test]
fn record_without_auto_save_flag_reads_as_regular() {
    let repo = repo();
    let raw = r#"{"drafts":{"d1":{"id":"d1","name":"Legacy","status":"valid","data":{"invoiceNumber":"7"},"createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-01T00:00:00.000Z"}},"version":"1.0.0"}"#;
    repo.store().set(DRAFTS_KEY, raw).unwrap();
    let record = repo.get("d1").unwrap().unwrap();
    assert!(!record.is_auto_save);
    assert_eq!(record.data.invoice_number, "7");
}

#[test]
fn save_over_quota_surfaces_error_and_keeps_envelope() {
    let store = Arc::new(MemoryStore::with_capacity(400));
    let repo = DraftRepository::open(store.clone()).unwrap();
    let big = DocumentSnapshot { sold_to: "x".repeat(1000), ..DocumentSnapshot::default() };
    let err = repo.save(Draft::new("Big", DraftStatus::Draft, big), None).expect_err("quota");
    assert!(err.is_quota_exceeded());
    assert!(repo.list().unwrap().is_empty());
}

#[test]
fn corrupt_envelope_is_surfaced() {
    let repo = repo();
    repo.store().set(DRAFTS_KEY, "[broken").unwrap();
    let err = repo.list().expect_err("malformed");
    assert!(matches!(err, StorageError::MalformedRecord { .. }));
}

// =============================================================================
// list / find_auto_save
// =============================================================================

#[test]
fn list_recent_orders_newest_first() {
    let repo = repo();
    let a = repo.save(Draft::new("A", DraftStatus::Draft, snapshot("1")), None).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let b = repo.save(Draft::new("B", DraftStatus::Draft, snapshot("2")), None).unwrap();
    let ids: Vec<String> = repo.list_recent().unwrap().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![b, a]);
}

#[test]
fn find_auto_save_picks_newest_flagged_record() {
    let repo = repo();
    repo.save(Draft::new("Manual", DraftStatus::Draft, snapshot("1")), None).unwrap();
    let mut old = Draft::new("Old auto", DraftStatus::AutoSave, snapshot("2"));
    old.is_auto_save = true;
    repo.save(old.clone(), Some("auto_old")).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    repo.save(old, Some("auto_new")).unwrap();

    let found = repo.find_auto_save().unwrap().unwrap();
    assert_eq!(found.id, "auto_new");
}

#[test]
fn find_auto_save_none_when_no_slot() {
    let repo = repo();
    repo.save(Draft::new("Manual", DraftStatus::Draft, snapshot("1")), None).unwrap();
    assert!(repo.find_auto_save().unwrap().is_none());
}

// =============================================================================
// delete / clear
// =============================================================================

#[test]
fn delete_removes_permanently() {
    let repo = repo();
    let id = repo.save(Draft::new("Gone", DraftStatus::Draft, snapshot("1")), None).unwrap();
    repo.delete(&id).unwrap();
    assert!(repo.get(&id).unwrap().is_none());
}

#[test]
fn delete_absent_is_noop() {
    assert!(repo().delete("nope").is_ok());
}

#[test]
fn clear_removes_all_drafts_but_keeps_version() {
    let repo = repo();
    repo.save(Draft::new("A", DraftStatus::Draft, snapshot("1")), None).unwrap();
    repo.save(Draft::new("B", DraftStatus::Draft, snapshot("2")), None).unwrap();
    repo.clear().unwrap();
    let storage = repo.load().unwrap();
    assert!(storage.drafts.is_empty());
    assert_eq!(storage.version, STORAGE_VERSION);
}

// =============================================================================
// usage_info
// =============================================================================

#[test]
fn usage_thresholds() {
    let low = StorageUsage::new(50, 100);
    assert_eq!(low.percent_used, 50.0);
    assert!(!low.warning && !low.critical);

    let warn = StorageUsage::new(85, 100);
    assert!(warn.warning && !warn.critical);

    let crit = StorageUsage::new(95, 100);
    assert!(crit.warning && crit.critical);
    assert_eq!(crit.available_bytes, 5);
}

#[test]
fn usage_exactly_at_threshold_is_not_flagged() {
    let usage = StorageUsage::new(80, 100);
    assert!(!usage.warning);
}

#[test]
fn usage_info_reflects_store() {
    let store = Arc::new(MemoryStore::with_capacity(10_000));
    let repo = DraftRepository::open(store.clone()).unwrap();
    let usage = repo.usage_info().unwrap();
    assert_eq!(usage.used_bytes, store.used_bytes().unwrap());
    assert_eq!(usage.capacity_bytes, 10_000);
}
