/*!
 * # polyharvest - multilingual collection and persistence pipeline
 *
 * Collects posts and replies from community feeds, detects their language,
 * translates non-target-language content, flags topic keywords in the
 * original and translated text, and upserts the result into SQLite.
 *
 * ## Features
 *
 * - Language detection with a short-text `unknown` fallback
 * - Translation through a cache and an ordered list of backends
 *   (Google, MyMemory), never failing the run when they do
 * - Script-aware keyword matching over per-language keyword sets
 * - Per-source state machine tolerant of failing sources
 * - Idempotent upserts keyed by the source's natural ids
 * - A JSON run report per invocation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `sources`: Content source connectors (Reddit listings, JSON dumps)
 * - `keywords`: Keyword sets and matching
 * - `translation`: Translation services:
 *   - `translation::cache`: Durable translation cache
 *   - `translation::detection`: Language detection
 *   - `translation::orchestrator`: Cache and backend fallback
 * - `providers`: Translation backend clients
 * - `collector`: Collection controller
 * - `database`: SQLite persistence
 * - `report`: Run report
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(non_snake_case)]

// Public modules
pub mod app_config;
pub mod collector;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod keywords;
pub mod language_utils;
pub mod providers;
pub mod report;
pub mod sources;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use collector::{CollectionSummary, Collector, SourceOutcome, SourceState};
pub use database::{ContentRecord, ReplyRecord, Repository, RunStatistics, UpsertOutcome};
pub use errors::{CacheError, PersistenceError, ProviderError, SourceError};
pub use keywords::KeywordMatcher;
pub use language_utils::{get_language_name, language_codes_match, normalize_language_code};
pub use report::RunReport;
pub use translation::{TranslationCache, TranslationOrchestrator, TranslationResult};
