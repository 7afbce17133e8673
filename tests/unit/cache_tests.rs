/*!
 * Tests for the translation cache and its stores
 */

use polyharvest::database::DatabaseConnection;
use polyharvest::errors::CacheError;
use polyharvest::translation::{CacheOptions, JsonFileStore, MemoryStore, SqliteCacheStore, TranslationCache};

use crate::common;

fn options(flush_every: usize) -> CacheOptions {
    CacheOptions {
        flush_every,
        max_entries: None,
    }
}

#[test]
fn test_set_thenGet_shouldReturnTranslation() {
    let cache = TranslationCache::in_memory();

    cache.set("¿Dónde está la clínica?", "es", "en", "Where is the clinic?").unwrap();

    assert_eq!(
        cache.get("¿Dónde está la clínica?", "es", "en").as_deref(),
        Some("Where is the clinic?")
    );
    assert!(cache.get("¿Dónde está la clínica?", "es", "fr").is_none());
    assert!(cache.get("¿Dónde está la clínica?", "pt", "en").is_none());
}

#[test]
fn test_stats_shouldCountHitsAndMisses() {
    let cache = TranslationCache::in_memory();
    cache.set("hola", "es", "en", "hello").unwrap();

    cache.get("hola", "es", "en");
    cache.get("adiós", "es", "en");

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hit_rate, 0.5);
}

#[test]
fn test_jsonFileStore_closeThenReopen_shouldKeepEntries() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("translation_cache.json");

    {
        let cache = TranslationCache::open(Box::new(JsonFileStore::new(&path)), options(100)).unwrap();
        cache.insert("Necesito ayuda", "es", "en", "I need help", "google").unwrap();
        assert_eq!(cache.pending_writes(), 1);
        cache.close().unwrap();
    }

    let reopened = TranslationCache::open(Box::new(JsonFileStore::new(&path)), options(100)).unwrap();
    let entry = reopened.get_entry("Necesito ayuda", "es", "en").unwrap();
    assert_eq!(entry.translation, "I need help");
    assert_eq!(entry.backend, "google");
}

#[test]
fn test_jsonFileStore_withCorruptFile_shouldFailFatally() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("translation_cache.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let result = TranslationCache::open(Box::new(JsonFileStore::new(&path)), options(10));

    match result {
        Err(e) => {
            assert!(matches!(e, CacheError::Corrupt { .. }));
            assert!(e.is_fatal());
        }
        Ok(_) => panic!("corrupt cache file should not open"),
    }
}

#[test]
fn test_memoryStore_shouldOnlyFlushAtThreshold() {
    let store = MemoryStore::new();
    let cache = TranslationCache::open(Box::new(store.clone()), options(3)).unwrap();

    cache.insert("uno", "es", "en", "one", "mock").unwrap();
    cache.insert("dos", "es", "en", "two", "mock").unwrap();
    assert_eq!(store.save_count(), 0);

    cache.insert("tres", "es", "en", "three", "mock").unwrap();
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.persisted_len(), 3);
    assert_eq!(cache.pending_writes(), 0);
}

#[test]
fn test_sqliteCacheStore_shouldPersistAcrossOpens() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("cache.db");

    {
        let store = SqliteCacheStore::open(&path).unwrap();
        let cache = TranslationCache::open(Box::new(store), options(1)).unwrap();
        cache.insert("艾滋病预防", "zh", "en", "HIV prevention", "mymemory").unwrap();
        cache.close().unwrap();
    }

    let store = SqliteCacheStore::new(DatabaseConnection::new(&path).unwrap());
    let cache = TranslationCache::open(Box::new(store), options(1)).unwrap();
    assert_eq!(cache.get("艾滋病预防", "zh", "en").as_deref(), Some("HIV prevention"));
    assert_eq!(cache.len(), 1);
}
