/*!
 * Translation subsystem: caching, language detection and orchestration.
 *
 * - `cache`: durable translation cache with pluggable stores
 * - `detection`: language detection behind the `LanguageDetector` seam
 * - `orchestrator`: detect, consult the cache, fall back across backends
 */

// Re-export main types for easier usage
pub use self::cache::{CacheOptions, CacheStats, CacheStore, JsonFileStore, MemoryStore, SqliteCacheStore, TranslationCache};
pub use self::detection::{Detection, LanguageDetector, WhatlangDetector};
pub use self::orchestrator::{TranslationOrchestrator, TranslationResult, TranslationStats};

// Submodules
pub mod cache;
pub mod detection;
pub mod orchestrator;
