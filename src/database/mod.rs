/*!
 * Database module for durable storage of collected content.
 *
 * This module provides SQLite-based persistence for:
 * - Content items and their replies, deduplicated by natural key
 * - The translation cache table used by the SQLite cache store
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{CollectionStats, ContentRecord, ReplyRecord, RunStatistics, UpsertCounts, UpsertOutcome};
pub use repository::Repository;
