/*!
 * Tests for application configuration functionality
 */

use polyharvest::app_config::{BackendKind, CacheStoreKind, CollectionConfig, Config, ConnectorKind, LogLevel};

/// Test default configuration values
#[test]
fn test_defaultConfig_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.target_language, "en");
    assert_eq!(config.connector.kind, ConnectorKind::Reddit);
    assert_eq!(config.translation.backends, vec![BackendKind::Google, BackendKind::MyMemory]);
    assert!(config.translation.enabled);
    assert_eq!(config.cache.store, CacheStoreKind::Json);
    assert_eq!(config.collection.min_reply_length, 10);
    assert_eq!(config.collection.reply_translation_min_length, 20);
    assert!(config.collection.skip_existing);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withInvalidTargetLanguage_shouldFail() {
    let config = Config {
        target_language: "zz".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withFileConnectorWithoutPath_shouldFail() {
    let mut config = Config::default();
    config.connector.kind = ConnectorKind::File;
    assert!(config.validate().is_err());

    config.connector.file_path = Some("dump.json".to_string());
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withEnabledTranslationAndNoBackends_shouldFail() {
    let mut config = Config::default();
    config.translation.backends.clear();
    assert!(config.validate().is_err());

    config.translation.enabled = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withInconsistentReplyThresholds_shouldFail() {
    let mut config = Config::default();
    config.collection.min_reply_length = 30;
    config.collection.reply_translation_min_length = 20;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withZeroCacheLimits_shouldFail() {
    let mut config = Config::default();
    config.cache.flush_every = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.cache.max_entries = Some(0);
    assert!(config.validate().is_err());
}

#[test]
fn test_deserialize_withPartialJson_shouldFillDefaults() {
    let json = r#"{
        "target_language": "fr",
        "sources": ["askTO"],
        "cache": { "store": "sqlite" },
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.target_language, "fr");
    assert_eq!(config.sources, vec!["askTO".to_string()]);
    assert_eq!(config.cache.store, CacheStoreKind::Sqlite);
    assert_eq!(config.cache.flush_every, 10);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.collection.max_items_per_source, 1000);
    assert!(config.validate().is_ok());
}

#[test]
fn test_fetchLimit_shouldOversampleRecordCap() {
    let settings = CollectionConfig {
        max_items_per_source: 40,
        ..CollectionConfig::default()
    };

    assert_eq!(settings.fetch_limit(), 120);
    assert_eq!(
        CollectionConfig {
            max_items_per_source: usize::MAX,
            ..CollectionConfig::default()
        }
        .fetch_limit(),
        usize::MAX
    );
}

#[test]
fn test_paths_withExplicitLocations_shouldUseThem() {
    let mut config = Config::default();
    config.database.path = Some("/tmp/harvest.db".to_string());
    config.cache.path = Some("/tmp/cache.json".to_string());

    assert_eq!(config.database_path().unwrap().to_string_lossy(), "/tmp/harvest.db");
    assert_eq!(config.cache_path().unwrap().to_string_lossy(), "/tmp/cache.json");
}

#[test]
fn test_backendKind_fromStr_shouldIgnoreCase() {
    assert_eq!("Google".parse::<BackendKind>().unwrap(), BackendKind::Google);
    assert_eq!("MYMEMORY".parse::<BackendKind>().unwrap(), BackendKind::MyMemory);
    assert!("deepl".parse::<BackendKind>().is_err());
}
