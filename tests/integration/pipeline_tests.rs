/*!
 * End-to-end tests: collect, translate, persist and report
 */

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use polyharvest::app_config::CollectionConfig;
use polyharvest::collector::Collector;
use polyharvest::database::Repository;
use polyharvest::file_utils::FileManager;
use polyharvest::keywords::KeywordMatcher;
use polyharvest::providers::TranslationBackend;
use polyharvest::providers::mock::MockBackend;
use polyharvest::report::RunReport;
use polyharvest::translation::{CacheOptions, JsonFileStore, TranslationCache, TranslationOrchestrator};

use crate::common::{self, ScriptedConnector, english_spanish_detector, fast_settings, phrasebook, raw_item};

const SPANISH_POST: &str = "Necesito información sobre VIH";

fn connector() -> ScriptedConnector {
    ScriptedConnector::new().with_items(
        "askTO",
        vec![
            raw_item("p1", SPANISH_POST),
            raw_item("p2", "What are the best brunch spots downtown this weekend?"),
        ],
    )
}

fn open_cache(path: &Path) -> Arc<TranslationCache> {
    let store = Box::new(JsonFileStore::new(path));
    Arc::new(TranslationCache::open(store, CacheOptions::default()).unwrap())
}

fn build_collector(
    backend: MockBackend,
    cache: Arc<TranslationCache>,
    repository: Repository,
    settings: CollectionConfig,
) -> Collector {
    let backends: Vec<Arc<dyn TranslationBackend>> = vec![Arc::new(backend)];
    let orchestrator = TranslationOrchestrator::new(backends, cache, Box::new(english_spanish_detector()));

    Collector::new(
        KeywordMatcher::with_defaults("en"),
        Box::new(connector()),
        Arc::new(orchestrator),
        settings,
        "en",
    )
    .with_repository(repository)
}

fn askto() -> Vec<String> {
    vec!["askTO".to_string()]
}

fn stored_rows(repo: &Repository) -> i64 {
    repo.connection()
        .execute(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM content_items", [], |row| row.get(0))?))
        .unwrap()
}

#[tokio::test]
async fn test_pipeline_withSpanishPost_shouldTranslateFlagAndPersist() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let repo = Repository::open(dir.path().join("harvest.db")).unwrap();
    let cache = open_cache(&dir.path().join("cache.json"));
    let backend = MockBackend::working("google").with_custom_response(phrasebook);
    let collector = build_collector(backend, cache.clone(), repo.clone(), fast_settings());

    let started_at = Utc::now();
    let summary = collector.collect(&askto()).await;
    let stats = repo
        .bulk_upsert(&summary.records)
        .await
        .with_upstream_skips(&summary.skipped_by_source());
    cache.close().unwrap();

    assert_eq!(stats.saved, 1);
    assert_eq!(stats.errors, 0);
    assert_eq!(summary.outcomes[0].discarded, 1);

    let stored = repo.get_item("p1").await.unwrap().expect("Spanish post should be stored");
    assert_eq!(stored.language, "es");
    assert_eq!(stored.body, SPANISH_POST);
    assert_eq!(stored.translated_body.as_deref(), Some("I need information about HIV"));
    assert_eq!(stored.translation_backend.as_deref(), Some("google"));
    assert!(stored.contains_target_keywords);
    assert!(!repo.exists("p2").await.unwrap());

    let report = RunReport::build(started_at, &summary, &collector.orchestrator().stats(), Some(&stats))
        .with_cache(collector.orchestrator().cache().stats());
    let report_dir = dir.path().join("reports");
    let path = report.write(&report_dir).unwrap();

    let loaded: RunReport = FileManager::read_json(&path).unwrap();
    assert_eq!(loaded.total_records, 1);
    assert_eq!(loaded.keyword_records, 1);
    assert_eq!(loaded.language_distribution["es"], 1);
    assert_eq!(loaded.translation.translated, 1);
    assert_eq!(loaded.translation.backend_usage["google"], 1);
    assert_eq!(loaded.persistence.map(|p| p.saved), Some(1));
    let cache = loaded.translation.cache.expect("cache counters should be reported");
    assert!(cache.entries >= 1);
    assert!(cache.misses >= 1);
    assert_eq!(loaded.sources[0].translation_failed, 0);
}

#[tokio::test]
async fn test_pipeline_rerunWithoutSkipping_shouldUpdateFromCache() {
    let dir = common::create_temp_dir().unwrap();
    let db_path = dir.path().join("harvest.db");
    let cache_path = dir.path().join("cache.json");
    let settings = CollectionConfig {
        skip_existing: false,
        ..fast_settings()
    };

    {
        let repo = Repository::open(&db_path).unwrap();
        let cache = open_cache(&cache_path);
        let backend = MockBackend::working("google").with_custom_response(phrasebook);
        let collector = build_collector(backend, cache.clone(), repo.clone(), settings.clone());
        let summary = collector.collect(&askto()).await;
        assert_eq!(repo.bulk_upsert(&summary.records).await.saved, 1);
        cache.close().unwrap();
    }

    let repo = Repository::open(&db_path).unwrap();
    let cache = open_cache(&cache_path);
    let backend = MockBackend::failing("google");
    let handle = backend.clone();
    let collector = build_collector(backend, cache, repo.clone(), settings);

    let summary = collector.collect(&askto()).await;
    let stats = repo.bulk_upsert(&summary.records).await;

    assert_eq!(handle.calls(), 0);
    assert_eq!(summary.records[0].translation_backend.as_deref(), Some("cache"));
    assert_eq!(summary.records[0].translated_body.as_deref(), Some("I need information about HIV"));
    assert_eq!(stats.saved, 0);
    assert_eq!(stats.updated, 1);
    assert_eq!(stored_rows(&repo), 1);
}

#[tokio::test]
async fn test_pipeline_rerunWithSkipping_shouldCountStoredItemsAsSkipped() {
    let dir = common::create_temp_dir().unwrap();
    let repo = Repository::open(dir.path().join("harvest.db")).unwrap();
    let backend = MockBackend::working("google").with_custom_response(phrasebook);
    let handle = backend.clone();
    let collector = build_collector(
        backend,
        Arc::new(TranslationCache::in_memory()),
        repo.clone(),
        fast_settings(),
    );

    let first = collector.collect(&askto()).await;
    repo.bulk_upsert(&first.records).await;
    let calls_after_first = handle.calls();

    let second = collector.collect(&askto()).await;
    let stats = repo
        .bulk_upsert(&second.records)
        .await
        .with_upstream_skips(&second.skipped_by_source());

    assert!(second.records.is_empty());
    assert_eq!(second.outcomes[0].skipped_existing, 1);
    assert_eq!(second.outcomes[0].discarded, 1);
    assert_eq!(handle.calls(), calls_after_first);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.by_source["askTO"].skipped, 1);
    assert_eq!(stored_rows(&repo), 1);
}
