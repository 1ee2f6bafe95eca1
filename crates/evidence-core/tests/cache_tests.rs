//! Cache store persistence tests

use std::time::Duration;

use chrono::Utc;
use evidence_core::cache::CacheStore;
use evidence_core::{CachedRecord, Identifier, TierAttempt, TierError, TierName};
use tempfile::TempDir;

fn record(raw: &str, tier: TierName) -> CachedRecord {
    let identifier = Identifier::parse(raw).unwrap();
    CachedRecord {
        doi: identifier.doi().map(str::to_string),
        identifier,
        title: Some("Iron oxidation in acidic biofilms".to_string()),
        abstract_text: Some("Ferrous iron was oxidized rapidly.".to_string()),
        authors: vec!["Doe Jane".to_string()],
        year: Some(2019),
        journal: Some("Frontiers in Microbiology".to_string()),
        pdf_url: "https://www.frontiersin.org/articles/10.3389/fmicb.2019.00872/pdf".to_string(),
        pdf_source_tier: tier,
        pdf_local_path: None,
        extracted_text: None,
        fetched_at: Utc::now(),
    }
}

fn failed_attempts() -> Vec<TierAttempt> {
    vec![
        TierAttempt::failure(TierName::Publisher, TierError::HttpStatus(403), Duration::from_millis(120)),
        TierAttempt::skipped(TierName::FallbackMirror, "no mirrors configured"),
    ]
}

fn open(dir: &TempDir) -> CacheStore {
    CacheStore::open(dir.path().join("evidence.sqlite")).unwrap()
}

#[test]
fn test_records_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    let stored = record("doi:10.3389/fmicb.2019.00872", TierName::Publisher);
    open(&dir).put(&stored).unwrap();

    let reopened = open(&dir);
    let id = Identifier::parse("10.3389/FMICB.2019.00872").unwrap();
    assert_eq!(reopened.get(&id).unwrap(), Some(stored));
    assert_eq!(reopened.len().unwrap(), 1);
}

#[test]
fn test_negative_entries_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    let id = Identifier::parse("PMID:31234567").unwrap();
    {
        let store = open(&dir);
        store.record_negative(&id, &failed_attempts()).unwrap();
        store.record_negative(&id, &failed_attempts()).unwrap();
    }

    let entry = open(&dir).get_negative(&id).unwrap().unwrap();
    assert_eq!(entry.cascade_count, 2);
    assert_eq!(entry.attempts, failed_attempts());
}

#[test]
fn test_put_replaces_negative_entry() {
    let store = CacheStore::in_memory().unwrap();
    let stored = record("doi:10.1099/ijs.0.65409-0", TierName::FallbackMirror);
    store.record_negative(&stored.identifier, &failed_attempts()).unwrap();

    store.put(&stored).unwrap();

    assert!(store.get_negative(&stored.identifier).unwrap().is_none());
    assert!(store.get(&stored.identifier).unwrap().is_some());
}

#[test]
fn test_corrupt_row_is_treated_as_miss() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("evidence.sqlite");
    let stored = record("doi:10.3389/fmicb.2019.00872", TierName::Publisher);
    CacheStore::open(&path).unwrap().put(&stored).unwrap();

    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE records SET payload = ?1 WHERE key = ?2",
        rusqlite::params!["{\"identifier\": 42", stored.identifier.cache_key()],
    )
    .unwrap();
    drop(conn);

    let store = CacheStore::open(&path).unwrap();
    assert_eq!(store.get(&stored.identifier).unwrap(), None);
    // The unreadable row is gone
    assert!(store.is_empty().unwrap());
}

#[test]
fn test_record_under_wrong_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("evidence.sqlite");
    let stored = record("doi:10.3389/fmicb.2019.00872", TierName::Publisher);
    CacheStore::open(&path).unwrap().put(&stored).unwrap();

    let other = Identifier::parse("doi:10.1371/journal.pone.0000001").unwrap();
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE records SET key = ?1 WHERE key = ?2",
        rusqlite::params![other.cache_key(), stored.identifier.cache_key()],
    )
    .unwrap();
    drop(conn);

    let store = CacheStore::open(&path).unwrap();
    assert_eq!(store.get(&other).unwrap(), None);
}

#[test]
fn test_store_document_next_to_database() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let id = Identifier::parse("doi:10.1099/ijs.0.65409-0").unwrap();

    let path = store.store_document(&id, b"%PDF-1.4 test").unwrap().unwrap();

    assert!(path.starts_with(dir.path().join("documents")));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));
    assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 test");
}

#[test]
fn test_similar_dois_get_separate_documents() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir);
    let underscore = Identifier::parse("doi:10.1234/a_b").unwrap();
    let slash = Identifier::parse("doi:10.1234/a/b").unwrap();

    let first = store.store_document(&underscore, b"%PDF-1.4 first").unwrap().unwrap();
    let second = store.store_document(&slash, b"%PDF-1.4 second").unwrap().unwrap();

    assert_ne!(first, second);
    assert_eq!(std::fs::read(&first).unwrap(), b"%PDF-1.4 first");
    assert_eq!(std::fs::read(&second).unwrap(), b"%PDF-1.4 second");
}

#[test]
fn test_invalidate_removes_both_entries() {
    let store = CacheStore::in_memory().unwrap();
    let stored = record("doi:10.3389/fmicb.2019.00872", TierName::Publisher);
    store.put(&stored).unwrap();
    store.record_negative(&stored.identifier, &failed_attempts()).unwrap();

    store.invalidate(&stored.identifier).unwrap();

    assert!(store.get(&stored.identifier).unwrap().is_none());
    assert!(store.get_negative(&stored.identifier).unwrap().is_none());
}
