//! Verdict cache persisted in sled, in front of a provider.
mod common;

use std::sync::Arc;

use common::FakeValidator;
use wordchain::storage::{SledStore, WordCacheStore};
use wordchain::validator::{CachedValidator, WordValidator};

#[tokio::test]
async fn verdicts_survive_a_restart_within_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db");
    let provider = Arc::new(FakeValidator::new(&["zzq"], &[]));

    {
        let store = Arc::new(SledStore::open(&path).unwrap());
        let validator = CachedValidator::new(provider.clone(), store.clone(), 30);
        let first = validator.validate("Apple", "en").await;
        assert!(first.is_acceptable());
        assert!(!first.served_from_cache);
        let second = validator.validate("apple", "en").await;
        assert!(second.served_from_cache);

        let bogus = validator.validate("zzq", "en").await;
        assert!(!bogus.valid);
        assert!(validator.validate("zzq", "en").await.served_from_cache);
        assert_eq!(provider.calls(), 2);
    }

    let store = Arc::new(SledStore::open(&path).unwrap());
    let cached = store.cached_verdict("apple", "en").unwrap().expect("persisted");
    assert!(cached.is_valid);
    assert_eq!(cached.category.as_deref(), Some("noun"));

    let validator = CachedValidator::new(provider.clone(), store, 30);
    assert!(validator.validate("apple", "en").await.served_from_cache);
    // Same word, other language: separate entry.
    assert!(!validator.validate("apple", "de").await.served_from_cache);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn zero_ttl_always_asks_the_provider() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SledStore::open(dir.path().join("db")).unwrap());
    let provider = Arc::new(FakeValidator::default());
    let validator = CachedValidator::new(provider.clone(), store, 0);

    validator.validate("apple", "en").await;
    let again = validator.validate("apple", "en").await;
    assert!(!again.served_from_cache);
    assert_eq!(provider.calls(), 2);
}
