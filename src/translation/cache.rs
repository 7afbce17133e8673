/*!
 * Translation caching functionality.
 *
 * The cache maps `(text, source language, target language)` to a previously
 * obtained translation so repeated content never costs a second backend
 * call. Entries are keyed by a 128-bit digest of the whitespace-normalized
 * text and both language codes, loaded fully into memory on `open`, and
 * written back through an injected [`CacheStore`]:
 *
 * - new entries are buffered and flushed every `flush_every` writes, so a
 *   crash loses at most that many entries;
 * - `close` (or dropping the cache) performs the final flush.
 *
 * Entries are immutable: storing a key that already exists is a no-op.
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::database::DatabaseConnection;
use crate::errors::CacheError;
use crate::file_utils::FileManager;

/// A single cached translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Translated text
    pub translation: String,
    /// Unix timestamp (seconds) of when the entry was written
    pub timestamp: i64,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Backend that produced the translation
    pub backend: String,
}

/// Changes handed to a store on flush
pub struct CacheSnapshot<'a> {
    /// Every live entry
    pub entries: &'a HashMap<String, CacheEntry>,
    /// Keys written since the previous flush
    pub added: &'a [String],
    /// Keys evicted since the previous flush
    pub evicted: &'a [String],
}

/// Durable storage behind a [`TranslationCache`]
pub trait CacheStore: Send + Sync {
    /// Load every stored entry
    fn load(&self) -> Result<HashMap<String, CacheEntry>, CacheError>;

    /// Persist the changes described by the snapshot
    fn save(&self, snapshot: &CacheSnapshot<'_>) -> Result<(), CacheError>;

    /// Human readable location, for logs
    fn describe(&self) -> String;
}

/// Cache store backed by a single JSON document
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> Result<HashMap<String, CacheEntry>, CacheError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&content).map_err(|e| CacheError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn save(&self, snapshot: &CacheSnapshot<'_>) -> Result<(), CacheError> {
        // The whole document is rewritten; additions and evictions are implied
        FileManager::write_json_atomic(&self.path, snapshot.entries)
            .map_err(|e| CacheError::Store(format!("{:#}", e)))
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// Cache store backed by the `translation_cache` table of a SQLite database
pub struct SqliteCacheStore {
    db: DatabaseConnection,
}

impl SqliteCacheStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let db = DatabaseConnection::new(path).map_err(|e| CacheError::Store(format!("{:#}", e)))?;
        Ok(Self::new(db))
    }
}

impl CacheStore for SqliteCacheStore {
    fn load(&self) -> Result<HashMap<String, CacheEntry>, CacheError> {
        self.db
            .execute(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT cache_key, translation, created_at, source_language, target_language, backend
                     FROM translation_cache",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        CacheEntry {
                            translation: row.get(1)?,
                            timestamp: row.get(2)?,
                            source_language: row.get(3)?,
                            target_language: row.get(4)?,
                            backend: row.get(5)?,
                        },
                    ))
                })?;

                let mut entries = HashMap::new();
                for row in rows {
                    let (key, entry) = row?;
                    entries.insert(key, entry);
                }
                Ok(entries)
            })
            .map_err(|e| CacheError::Store(format!("{:#}", e)))
    }

    fn save(&self, snapshot: &CacheSnapshot<'_>) -> Result<(), CacheError> {
        let added: Vec<(String, CacheEntry)> = snapshot
            .added
            .iter()
            .filter_map(|key| snapshot.entries.get(key).map(|e| (key.clone(), e.clone())))
            .collect();
        let evicted = snapshot.evicted.to_vec();

        self.db
            .transaction(|tx| {
                for (key, entry) in &added {
                    tx.execute(
                        "INSERT OR IGNORE INTO translation_cache
                            (cache_key, translation, created_at, source_language, target_language, backend)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            key,
                            entry.translation,
                            entry.timestamp,
                            entry.source_language,
                            entry.target_language,
                            entry.backend,
                        ],
                    )?;
                }
                for key in &evicted {
                    tx.execute("DELETE FROM translation_cache WHERE cache_key = ?1", [key])?;
                }
                Ok(())
            })
            .map_err(|e| CacheError::Store(format!("{:#}", e)))
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.db.path().display())
    }
}

/// Volatile store, for tests and cache-less runs
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `save` has been called
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of entries currently persisted
    pub fn persisted_len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> Result<HashMap<String, CacheEntry>, CacheError> {
        Ok(self.entries.lock().clone())
    }

    fn save(&self, snapshot: &CacheSnapshot<'_>) -> Result<(), CacheError> {
        *self.entries.lock() = snapshot.entries.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Cache tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    /// Flush after this many new entries
    pub flush_every: usize,
    /// Evict oldest entries beyond this many
    pub max_entries: Option<usize>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            flush_every: 10,
            max_entries: None,
        }
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
    pub hit_rate: f64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    pending: Vec<String>,
    evicted: Vec<String>,
    closed: bool,
}

/// Translation cache for storing and retrieving translations
pub struct TranslationCache {
    store: Box<dyn CacheStore>,
    options: CacheOptions,
    state: RwLock<CacheState>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl TranslationCache {
    /// Open a cache over the given store, loading every persisted entry
    ///
    /// A store that exists but cannot be decoded yields
    /// [`CacheError::Corrupt`], which callers treat as fatal.
    pub fn open(store: Box<dyn CacheStore>, options: CacheOptions) -> Result<Self, CacheError> {
        let entries = store.load()?;
        info!("Loaded {} cached translations from {}", entries.len(), store.describe());

        let cache = Self {
            store,
            options: CacheOptions {
                flush_every: options.flush_every.max(1),
                ..options
            },
            state: RwLock::new(CacheState {
                entries,
                ..Default::default()
            }),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        };

        {
            let mut state = cache.state.write();
            cache.evict_overflow(&mut state);
        }

        Ok(cache)
    }

    /// Cache over a fresh [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self {
            store: Box::new(MemoryStore::new()),
            options: CacheOptions::default(),
            state: RwLock::new(CacheState::default()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Derive the cache key for a text and language pair
    ///
    /// Whitespace runs collapse to one space and language codes are
    /// lowercased before hashing, so cosmetic differences share a key.
    pub fn cache_key(text: &str, source_language: &str, target_language: &str) -> String {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hasher.update([0x1f]);
        hasher.update(source_language.trim().to_lowercase().as_bytes());
        hasher.update([0x1f]);
        hasher.update(target_language.trim().to_lowercase().as_bytes());
        let digest = hasher.finalize();

        digest[..16].iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Get a translation from the cache
    pub fn get(&self, text: &str, source_language: &str, target_language: &str) -> Option<String> {
        self.get_entry(text, source_language, target_language)
            .map(|entry| entry.translation)
    }

    /// Get the full cached entry
    pub fn get_entry(&self, text: &str, source_language: &str, target_language: &str) -> Option<CacheEntry> {
        let key = Self::cache_key(text, source_language, target_language);
        let state = self.state.read();

        match state.entries.get(&key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for '{}' ({} -> {})",
                       truncate_text(text, 30), source_language, target_language);
                Some(entry.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for '{}' ({} -> {})",
                       truncate_text(text, 30), source_language, target_language);
                None
            }
        }
    }

    /// Store a translation obtained outside the orchestrator
    pub fn set(&self, text: &str, source_language: &str, target_language: &str, translation: &str) -> Result<(), CacheError> {
        self.insert(text, source_language, target_language, translation, "external")
    }

    /// Store a translation, tagging the backend that produced it
    ///
    /// Existing keys are left untouched. Crossing the flush threshold
    /// writes the buffered entries through to the store.
    pub fn insert(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        translation: &str,
        backend: &str,
    ) -> Result<(), CacheError> {
        let key = Self::cache_key(text, source_language, target_language);
        let mut state = self.state.write();

        if state.entries.contains_key(&key) {
            debug!("Cache entry {} already present, keeping the original", key);
            return Ok(());
        }

        state.entries.insert(key.clone(), CacheEntry {
            translation: translation.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            backend: backend.to_string(),
        });
        state.pending.push(key);
        self.evict_overflow(&mut state);

        debug!("Cached translation for '{}' ({} -> {})",
               truncate_text(text, 30), source_language, target_language);

        if state.pending.len() >= self.options.flush_every {
            self.flush_locked(&mut state)?;
        }

        Ok(())
    }

    /// Write buffered changes to the store, returning how many entries were added
    pub fn flush(&self) -> Result<usize, CacheError> {
        let mut state = self.state.write();
        self.flush_locked(&mut state)
    }

    /// Final flush; the cache stays readable but will not flush again on drop
    pub fn close(&self) -> Result<(), CacheError> {
        let mut state = self.state.write();
        let written = self.flush_locked(&mut state)?;
        state.closed = true;
        info!("Translation cache closed ({} entries, {} written on close)",
              state.entries.len(), written);
        Ok(())
    }

    /// Number of entries in memory
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries not yet flushed
    pub fn pending_writes(&self) -> usize {
        self.state.read().pending.len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            entries: self.len(),
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
        }
    }

    fn flush_locked(&self, state: &mut CacheState) -> Result<usize, CacheError> {
        if state.pending.is_empty() && state.evicted.is_empty() {
            return Ok(0);
        }

        let snapshot = CacheSnapshot {
            entries: &state.entries,
            added: &state.pending,
            evicted: &state.evicted,
        };
        self.store.save(&snapshot)?;

        let written = state.pending.len();
        debug!("Flushed {} cache entries to {}", written, self.store.describe());
        state.pending.clear();
        state.evicted.clear();
        Ok(written)
    }

    fn evict_overflow(&self, state: &mut CacheState) {
        let Some(max_entries) = self.options.max_entries else {
            return;
        };
        if state.entries.len() <= max_entries {
            return;
        }

        let overflow = state.entries.len() - max_entries;
        let mut by_age: Vec<(i64, String)> = state
            .entries
            .iter()
            .map(|(key, entry)| (entry.timestamp, key.clone()))
            .collect();
        by_age.sort();

        for (_, key) in by_age.into_iter().take(overflow) {
            state.entries.remove(&key);
            state.pending.retain(|pending| pending != &key);
            state.evicted.push(key);
        }
        debug!("Evicted {} cache entries over the {} entry cap", overflow, max_entries);
    }
}

impl Drop for TranslationCache {
    fn drop(&mut self) {
        let mut state = self.state.write();
        if state.closed {
            return;
        }
        if let Err(e) = self.flush_locked(&mut state) {
            warn!("Failed to flush translation cache on drop: {}", e);
        }
    }
}

/// Helper function to truncate text for logging
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
