use anyhow::{anyhow, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

use crate::database::DatabaseConnection;
use crate::file_utils::FileManager;
use crate::language_utils;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language all content is normalized toward (ISO 639-1)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Languages the detector is allowed to report
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Ordered list of sources to collect from
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    /// Content source connector settings
    #[serde(default)]
    pub connector: ConnectorConfig,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Translation cache config
    #[serde(default)]
    pub cache: CacheConfig,

    /// Collection controller config
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Durable store config
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Optional JSON file with additional keyword sets
    #[serde(default)]
    pub keywords_file: Option<String>,

    /// Directory run reports are written to
    #[serde(default = "default_report_dir")]
    pub report_dir: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    // @backend: Public Google translate endpoint
    Google,
    // @backend: MyMemory translation memory API
    MyMemory,
}

impl BackendKind {
    // @returns: Lowercase backend identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::MyMemory => "mymemory",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "mymemory" => Ok(Self::MyMemory),
            _ => Err(anyhow!("Invalid backend type: {}", s)),
        }
    }
}

/// Content source connector type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    /// Public Reddit JSON listings
    #[default]
    Reddit,
    /// Local JSON dump mapping source names to items
    File,
}

impl std::str::FromStr for ConnectorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "reddit" => Ok(Self::Reddit),
            "file" => Ok(Self::File),
            _ => Err(anyhow!("Invalid connector type: {}", s)),
        }
    }
}

/// Connector configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectorConfig {
    // @field: Connector type
    #[serde(default, rename = "type")]
    pub kind: ConnectorKind,

    // @field: Input file for the file connector
    #[serde(default)]
    pub file_path: Option<String>,

    // @field: Listing endpoint base URL
    #[serde(default = "default_reddit_endpoint")]
    pub endpoint: String,

    // @field: User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // @field: Items requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            kind: ConnectorKind::default(),
            file_path: None,
            endpoint: default_reddit_endpoint(),
            user_agent: default_user_agent(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Whether non-matching, non-default-language items get translated
    /// and rechecked
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Backends tried in order after a cache miss
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendKind>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Google endpoint URL
    #[serde(default = "default_google_endpoint")]
    pub google_endpoint: String,

    /// MyMemory endpoint URL
    #[serde(default = "default_mymemory_endpoint")]
    pub mymemory_endpoint: String,

    /// Contact email for MyMemory's higher anonymous quota (optional)
    #[serde(default)]
    pub mymemory_email: Option<String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backends: default_backends(),
            timeout_secs: default_timeout_secs(),
            google_endpoint: default_google_endpoint(),
            mymemory_endpoint: default_mymemory_endpoint(),
            mymemory_email: None,
        }
    }
}

/// Cache storage backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheStoreKind {
    /// Single JSON document
    #[default]
    Json,
    /// Table inside a SQLite database
    Sqlite,
}

/// Translation cache configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Storage backend
    #[serde(default)]
    pub store: CacheStoreKind,

    /// Location of the cache artifact (defaults to the data directory)
    #[serde(default)]
    pub path: Option<String>,

    /// Number of new entries buffered before a flush
    #[serde(default = "default_flush_every")]
    pub flush_every: usize,

    /// Upper bound on cached entries; oldest entries are evicted first
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store: CacheStoreKind::default(),
            path: None,
            flush_every: default_flush_every(),
            max_entries: None,
        }
    }
}

/// Collection controller configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CollectionConfig {
    /// Courtesy delay between items in milliseconds
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,

    /// Courtesy delay between sources in milliseconds
    #[serde(default = "default_source_delay_ms")]
    pub source_delay_ms: u64,

    /// Maximum relevant records kept from a single source
    ///
    /// Sources are read up to `FETCH_OVERSAMPLE` times this many items since
    /// most fetched items are filtered out.
    #[serde(default = "default_max_items_per_source")]
    pub max_items_per_source: usize,

    /// Whether replies of relevant items are collected
    #[serde(default = "default_true")]
    pub collect_replies: bool,

    /// Maximum replies fetched per item
    #[serde(default = "default_max_replies_per_item")]
    pub max_replies_per_item: usize,

    /// Replies shorter than this (in characters) are dropped
    #[serde(default = "default_min_reply_length")]
    pub min_reply_length: usize,

    /// Replies shorter than this are stored untranslated
    #[serde(default = "default_reply_translation_min_length")]
    pub reply_translation_min_length: usize,

    /// Skip items whose key is already in the store
    #[serde(default = "default_true")]
    pub skip_existing: bool,
}

/// Fetch multiplier over the per-source record cap
pub const FETCH_OVERSAMPLE: usize = 3;

impl CollectionConfig {
    /// Raw items requested from one source
    pub fn fetch_limit(&self) -> usize {
        self.max_items_per_source.saturating_mul(FETCH_OVERSAMPLE)
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            item_delay_ms: default_item_delay_ms(),
            source_delay_ms: default_source_delay_ms(),
            max_items_per_source: default_max_items_per_source(),
            collect_replies: true,
            max_replies_per_item: default_max_replies_per_item(),
            min_reply_length: default_min_reply_length(),
            reply_translation_min_length: default_reply_translation_min_length(),
            skip_existing: true,
        }
    }
}

/// Durable store configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    /// SQLite file location (defaults to the data directory)
    #[serde(default)]
    pub path: Option<String>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_languages() -> Vec<String> {
    ["en", "es", "fr", "zh", "tl", "pa"]
        .iter()
        .map(|code| code.to_string())
        .collect()
}

fn default_sources() -> Vec<String> {
    ["NewToCanada", "toronto", "askTO", "ontario", "canada", "askgaybros"]
        .iter()
        .map(|source| source.to_string())
        .collect()
}

fn default_backends() -> Vec<BackendKind> {
    vec![BackendKind::Google, BackendKind::MyMemory]
}

fn default_report_dir() -> String {
    "reports".to_string()
}

fn default_reddit_endpoint() -> String {
    "https://www.reddit.com".to_string()
}

fn default_google_endpoint() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}

fn default_mymemory_endpoint() -> String {
    "https://api.mymemory.translated.net/get".to_string()
}

fn default_user_agent() -> String {
    format!("polyharvest/{} (research collection)", env!("CARGO_PKG_VERSION"))
}

fn default_page_size() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_flush_every() -> usize {
    10
}

fn default_item_delay_ms() -> u64 {
    100
}

fn default_source_delay_ms() -> u64 {
    2500
}

fn default_max_items_per_source() -> usize {
    1000
}

fn default_max_replies_per_item() -> usize {
    50
}

fn default_min_reply_length() -> usize {
    10
}

fn default_reply_translation_min_length() -> usize {
    20
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        language_utils::normalize_language_code(&self.target_language)
            .map_err(|e| anyhow!("Invalid target language: {}", e))?;

        for language in &self.languages {
            language_utils::normalize_language_code(language)
                .map_err(|e| anyhow!("Invalid detector language: {}", e))?;
        }

        if self.sources.iter().any(|s| s.trim().is_empty()) {
            return Err(anyhow!("Source names must not be empty"));
        }

        if self.connector.kind == ConnectorKind::File && self.connector.file_path.is_none() {
            return Err(anyhow!("The file connector requires connector.file_path"));
        }

        if self.connector.page_size == 0 {
            return Err(anyhow!("connector.page_size must be greater than zero"));
        }

        if self.translation.enabled && self.translation.backends.is_empty() {
            return Err(anyhow!("At least one translation backend is required when translation is enabled"));
        }

        if self.cache.flush_every == 0 {
            return Err(anyhow!("cache.flush_every must be greater than zero"));
        }

        if self.cache.max_entries == Some(0) {
            return Err(anyhow!("cache.max_entries must be greater than zero when set"));
        }

        if self.collection.reply_translation_min_length < self.collection.min_reply_length {
            return Err(anyhow!(
                "collection.reply_translation_min_length ({}) is below min_reply_length ({})",
                self.collection.reply_translation_min_length,
                self.collection.min_reply_length
            ));
        }

        Ok(())
    }

    /// Resolved location of the SQLite store
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => DatabaseConnection::default_database_path(),
        }
    }

    /// Resolved location of the translation cache artifact
    pub fn cache_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.cache.path {
            return Ok(PathBuf::from(path));
        }

        let filename = match self.cache.store {
            CacheStoreKind::Json => "translation_cache.json",
            CacheStoreKind::Sqlite => "translation_cache.db",
        };
        Ok(FileManager::data_dir()?.join(filename))
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            languages: default_languages(),
            sources: default_sources(),
            connector: ConnectorConfig::default(),
            translation: TranslationConfig::default(),
            cache: CacheConfig::default(),
            collection: CollectionConfig::default(),
            database: DatabaseConfig::default(),
            keywords_file: None,
            report_dir: default_report_dir(),
            log_level: LogLevel::default(),
        }
    }
}
