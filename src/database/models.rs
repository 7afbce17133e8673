/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Result of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// A new row was inserted
    Created,
    /// An existing row was overwritten
    Updated,
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertOutcome::Created => write!(f, "created"),
            UpsertOutcome::Updated => write!(f, "updated"),
        }
    }
}

/// A normalized content item (post)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Natural key assigned by the source
    pub item_id: String,
    /// Source collection name
    pub source: String,
    pub title: String,
    pub body: String,
    /// Author handle, `[deleted]` for removed accounts
    pub author: Option<String>,
    /// Epoch seconds
    pub created_at: i64,
    pub score: i64,
    pub reply_count: i64,
    pub permalink: String,
    /// Detected language (ISO 639-1 or `unknown`)
    pub language: String,
    pub translated_body: Option<String>,
    pub translation_backend: Option<String>,
    pub translation_confidence: Option<f64>,
    pub contains_target_keywords: bool,
    pub is_secondary_related: bool,
    /// Replies persisted after this record
    #[serde(default)]
    pub replies: Vec<ReplyRecord>,
}

/// A normalized reply (comment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyRecord {
    /// Natural key assigned by the source
    pub reply_id: String,
    /// Natural key of the owning content item
    pub item_id: String,
    /// Raw parent reference reported by the source
    pub parent_ref: Option<String>,
    pub author: Option<String>,
    pub body: String,
    pub created_at: i64,
    pub score: i64,
    pub language: String,
    pub translated_body: Option<String>,
    pub translation_backend: Option<String>,
    pub translation_confidence: Option<f64>,
    pub is_secondary_related: bool,
}

/// Saved/updated/skipped/errored counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertCounts {
    pub saved: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl UpsertCounts {
    pub fn total(&self) -> usize {
        self.saved + self.updated + self.skipped + self.errors
    }
}

/// Statistics of one `bulk_upsert` call
///
/// Built while the batch runs and handed out by value once it completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub saved: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Replies written alongside their items
    pub replies_written: usize,
    /// Counters per source collection
    pub by_source: BTreeMap<String, UpsertCounts>,
    /// Saved plus updated records per language
    pub by_language: BTreeMap<String, usize>,
}

impl RunStatistics {
    pub(crate) fn record_saved(&mut self, record: &ContentRecord, outcome: UpsertOutcome) {
        let counts = self.by_source.entry(record.source.clone()).or_default();
        match outcome {
            UpsertOutcome::Created => {
                self.saved += 1;
                counts.saved += 1;
            }
            UpsertOutcome::Updated => {
                self.updated += 1;
                counts.updated += 1;
            }
        }
        self.replies_written += record.replies.len();
        *self.by_language.entry(record.language.clone()).or_insert(0) += 1;
    }

    pub(crate) fn record_skipped(&mut self, record: &ContentRecord) {
        self.skipped += 1;
        self.by_source.entry(record.source.clone()).or_default().skipped += 1;
    }

    pub(crate) fn record_error(&mut self, record: &ContentRecord) {
        self.errors += 1;
        self.by_source.entry(record.source.clone()).or_default().errors += 1;
    }

    /// Fold skips decided upstream (already-collected items) into the totals
    pub fn with_upstream_skips(mut self, skipped_by_source: &BTreeMap<String, usize>) -> Self {
        for (source, skipped) in skipped_by_source {
            self.skipped += skipped;
            self.by_source.entry(source.clone()).or_default().skipped += skipped;
        }
        self
    }

    pub fn total(&self) -> usize {
        self.saved + self.updated + self.skipped + self.errors
    }
}

/// Whole-store summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_items: i64,
    pub total_replies: i64,
    pub translated_items: i64,
    pub keyword_items: i64,
    pub by_source: BTreeMap<String, i64>,
    pub by_language: BTreeMap<String, i64>,
}

impl fmt::Display for CollectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Items: {}, Replies: {}, Translated: {}, Keyword matches: {}",
            self.total_items, self.total_replies, self.translated_items, self.keyword_items
        )?;
        for (source, count) in &self.by_source {
            writeln!(f, "  source {:<24} {}", source, count)?;
        }
        for (language, count) in &self.by_language {
            writeln!(f, "  language {:<22} {}", language, count)?;
        }
        Ok(())
    }
}
