#![forbid(unsafe_code)]

use lt_core::FlatRecord;
use lt_storage::{
    KeyValueStore, LIST_KEY, LinkStorage, SETTINGS_KEY, SaveOutcome, SqliteKvStore, StoreError,
};
use serde_json::json;
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dir = base.join(format!("lt_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[test]
fn values_survive_reopen() {
    let storage_dir = temp_dir("values_survive_reopen");
    {
        let mut store = SqliteKvStore::open(&storage_dir, "laptop").expect("open store");
        store.save(LIST_KEY, &json!([{ "name": "a" }])).expect("save");
    }
    let store = SqliteKvStore::open(&storage_dir, "laptop").expect("reopen store");
    assert_eq!(
        store.load(LIST_KEY).expect("load"),
        Some(json!([{ "name": "a" }]))
    );
    assert_eq!(store.load(SETTINGS_KEY).expect("load"), None);
}

#[test]
fn change_feed_reports_other_devices_only() {
    let storage_dir = temp_dir("change_feed_reports_other_devices_only");
    let mut laptop = SqliteKvStore::open(&storage_dir, "laptop").expect("open laptop");
    let mut phone = SqliteKvStore::open(&storage_dir, "phone").expect("open phone");

    laptop.save(LIST_KEY, &json!([1])).expect("laptop save");
    laptop.save(LIST_KEY, &json!([1, 2])).expect("laptop save");
    assert!(laptop.poll_changes().expect("poll").is_empty());

    let seen = phone.poll_changes().expect("poll");
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].origin, "laptop");
    assert_eq!(seen[1].old_value, Some(json!([1])));
    assert_eq!(seen[1].new_value, Some(json!([1, 2])));
    assert!(phone.poll_changes().expect("poll again").is_empty());
}

#[test]
fn unreadable_change_row_is_skipped_not_fatal() {
    let storage_dir = temp_dir("unreadable_change_row_is_skipped_not_fatal");
    let mut laptop = SqliteKvStore::open(&storage_dir, "laptop").expect("open laptop");
    let mut phone = SqliteKvStore::open(&storage_dir, "phone").expect("open phone");

    laptop.save(LIST_KEY, &json!([1])).expect("laptop save");
    {
        let conn = rusqlite::Connection::open(storage_dir.join("linktree.db")).expect("open db");
        conn.execute(
            "INSERT INTO changes (key, old_value, new_value, device, ts_ms) \
             VALUES (?1, NULL, '{not json', 'tablet', 0)",
            [LIST_KEY],
        )
        .expect("insert bad row");
    }
    laptop.save(SETTINGS_KEY, &json!({ "theme": "dark" })).expect("laptop save");

    let seen = phone.poll_changes().expect("poll");
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].new_value, Some(json!([1])));
    assert_eq!(seen[1].key, SETTINGS_KEY);
    assert!(phone.poll_changes().expect("poll again").is_empty());
}

#[test]
fn late_opener_starts_after_existing_history() {
    let storage_dir = temp_dir("late_opener_starts_after_existing_history");
    let mut laptop = SqliteKvStore::open(&storage_dir, "laptop").expect("open laptop");
    laptop.save(LIST_KEY, &json!([1])).expect("save");

    let mut phone = SqliteKvStore::open(&storage_dir, "phone").expect("open phone");
    assert!(phone.poll_changes().expect("poll").is_empty());
    assert_eq!(phone.load(LIST_KEY).expect("load"), Some(json!([1])));
}

#[test]
fn identical_write_is_not_a_change() {
    let storage_dir = temp_dir("identical_write_is_not_a_change");
    let mut laptop = SqliteKvStore::open(&storage_dir, "laptop").expect("open laptop");
    let mut phone = SqliteKvStore::open(&storage_dir, "phone").expect("open phone");

    laptop.save(SETTINGS_KEY, &json!({ "theme": "dark" })).expect("save");
    phone.save(SETTINGS_KEY, &json!({ "theme": "dark" })).expect("save");
    assert!(laptop.poll_changes().expect("poll").is_empty());
}

#[test]
fn oversized_item_is_rejected_and_nothing_written() {
    let storage_dir = temp_dir("oversized_item_is_rejected_and_nothing_written");
    let mut store = SqliteKvStore::open(&storage_dir, "laptop").expect("open store");
    store.save(LIST_KEY, &json!(["small"])).expect("save");

    let big = "x".repeat(9_000);
    let err = store.save(LIST_KEY, &json!([big])).expect_err("quota");
    assert!(matches!(err, StoreError::QuotaExceeded { quota: 8_192, .. }));
    assert_eq!(store.load(LIST_KEY).expect("load"), Some(json!(["small"])));
}

#[test]
fn bytes_in_use_counts_key_and_encoded_value() {
    let storage_dir = temp_dir("bytes_in_use_counts_key_and_encoded_value");
    let mut store = SqliteKvStore::open(&storage_dir, "laptop").expect("open store");
    store.save(LIST_KEY, &json!([])).expect("save list");
    store.save(SETTINGS_KEY, &json!({})).expect("save settings");

    assert_eq!(store.bytes_in_use(Some(LIST_KEY)).expect("bytes"), 10);
    assert_eq!(store.bytes_in_use(None).expect("bytes"), 10 + 13);
}

#[test]
fn link_storage_round_trip_over_sqlite() {
    let storage_dir = temp_dir("link_storage_round_trip_over_sqlite");
    let list = vec![
        FlatRecord::named("Work"),
        FlatRecord::named("Docs")
            .with_parent("Work")
            .with_url("https://docs.rs"),
    ];
    {
        let store = SqliteKvStore::open(&storage_dir, "laptop").expect("open store");
        let mut storage = LinkStorage::new(store);
        assert_eq!(storage.save_list(&list).expect("save"), SaveOutcome::Written);
    }

    let store = SqliteKvStore::open(&storage_dir, "phone").expect("open store");
    let mut storage = LinkStorage::new(store);
    let loaded = storage.load_list().expect("load");
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].parent.as_deref(), Some("Work"));
    assert_eq!(storage.save_list(&loaded).expect("save"), SaveOutcome::Unchanged);

    let usage = storage.usage().expect("usage");
    assert_eq!(usage.quota_bytes, 8_192);
    assert!(usage.percent >= 1);
}
