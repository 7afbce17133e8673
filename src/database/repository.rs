/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 *
 * Every upsert runs in its own transaction: a record whose write fails
 * (duplicate-key race, orphan reply) is rolled back alone and the batch
 * moves on. Two processes writing the same store are not coordinated;
 * a race on the lookup-then-insert step surfaces as an integrity error.
 */

use std::collections::HashSet;
use std::path::Path;

use log::{debug, error, info, warn};
use rusqlite::{params, Connection, OptionalExtension};

use super::connection::DatabaseConnection;
use super::models::{
    CollectionStats, ContentRecord, ReplyRecord, RunStatistics, UpsertOutcome,
};
use crate::errors::PersistenceError;

/// Log bulk progress every this many records
const PROGRESS_INTERVAL: usize = 50;

/// Maximum bound parameters per `IN (...)` query
const KEY_CHUNK_SIZE: usize = 500;

type PersistenceResult<T> = std::result::Result<T, PersistenceError>;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open (or create) the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let db = DatabaseConnection::new(path)?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> PersistenceResult<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection, shared with the SQLite cache store
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Whether a content item with this natural key is stored
    pub async fn exists(&self, item_id: &str) -> PersistenceResult<bool> {
        let item_id = item_id.to_string();

        let found = self
            .db
            .execute_async(move |conn| Ok(Self::item_row_id(conn, &item_id)?.is_some()))
            .await?;
        Ok(found)
    }

    /// Subset of `keys` already stored
    pub async fn existing_keys(&self, keys: &[String]) -> PersistenceResult<HashSet<String>> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }
        let keys = keys.to_vec();

        let found = self
            .db
            .execute_async(move |conn| {
                let mut found = HashSet::new();
                for chunk in keys.chunks(KEY_CHUNK_SIZE) {
                    let placeholders = vec!["?"; chunk.len()].join(", ");
                    let sql = format!(
                        "SELECT item_id FROM content_items WHERE item_id IN ({})",
                        placeholders
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                        row.get::<_, String>(0)
                    })?;
                    for row in rows {
                        found.insert(row?);
                    }
                }
                Ok(found)
            })
            .await?;

        debug!("{} of the requested keys are already stored", found.len());
        Ok(found)
    }

    fn item_row_id(conn: &Connection, item_id: &str) -> rusqlite::Result<Option<i64>> {
        conn.query_row(
            "SELECT id FROM content_items WHERE item_id = ?1",
            [item_id],
            |row| row.get(0),
        )
        .optional()
    }

    /// Item a stored reply belongs to
    fn reply_owner(conn: &Connection, reply_id: &str) -> rusqlite::Result<Option<String>> {
        conn.query_row(
            "SELECT item_id FROM reply_items WHERE reply_id = ?1",
            [reply_id],
            |row| row.get(0),
        )
        .optional()
    }

    // =========================================================================
    // Upserts
    // =========================================================================

    /// Insert or overwrite a content item and its replies
    ///
    /// The item row is written before its replies so the reply foreign key
    /// always resolves. Any failure rolls the whole record back.
    pub async fn upsert(&self, record: &ContentRecord) -> PersistenceResult<UpsertOutcome> {
        if record.item_id.trim().is_empty() {
            return Err(PersistenceError::Integrity(
                "content item has a blank natural key".to_string(),
            ));
        }
        let record = record.clone();

        let outcome = self
            .db
            .transaction_async(move |tx| {
                let now = chrono::Utc::now().to_rfc3339();
                let outcome = Self::upsert_item_sync(tx, &record, &now)?;

                for reply in &record.replies {
                    if !reply.item_id.is_empty() && reply.item_id != record.item_id {
                        return Err(PersistenceError::OrphanReply {
                            reply_id: reply.reply_id.clone(),
                            parent_id: reply.item_id.clone(),
                        }
                        .into());
                    }
                    Self::upsert_reply_sync(tx, reply, &record.item_id, &now)?;
                }

                Ok(outcome)
            })
            .await?;

        Ok(outcome)
    }

    /// Insert or overwrite a single reply under an already stored item
    pub async fn upsert_reply(&self, reply: &ReplyRecord) -> PersistenceResult<UpsertOutcome> {
        let reply = reply.clone();

        let outcome = self
            .db
            .transaction_async(move |tx| {
                if reply.item_id.trim().is_empty() || Self::item_row_id(tx, &reply.item_id)?.is_none() {
                    return Err(PersistenceError::OrphanReply {
                        reply_id: reply.reply_id.clone(),
                        parent_id: reply.item_id.clone(),
                    }
                    .into());
                }
                let now = chrono::Utc::now().to_rfc3339();
                Self::upsert_reply_sync(tx, &reply, &reply.item_id, &now)
            })
            .await?;

        Ok(outcome)
    }

    fn upsert_item_sync(conn: &Connection, record: &ContentRecord, now: &str) -> anyhow::Result<UpsertOutcome> {
        if Self::item_row_id(conn, &record.item_id)?.is_some() {
            conn.execute(
                r#"
                UPDATE content_items SET
                    source = ?2, title = ?3, body = ?4, author = ?5, created_at = ?6,
                    score = ?7, reply_count = ?8, permalink = ?9, language = ?10,
                    translated_body = ?11, translation_backend = ?12,
                    translation_confidence = ?13, contains_target_keywords = ?14,
                    is_secondary_related = ?15, updated_at = ?16
                WHERE item_id = ?1
                "#,
                params![
                    record.item_id,
                    record.source,
                    record.title,
                    record.body,
                    record.author,
                    record.created_at,
                    record.score,
                    record.reply_count,
                    record.permalink,
                    record.language,
                    record.translated_body,
                    record.translation_backend,
                    record.translation_confidence,
                    record.contains_target_keywords,
                    record.is_secondary_related,
                    now,
                ],
            )?;
            return Ok(UpsertOutcome::Updated);
        }

        // A concurrent writer inserting the same key trips the UNIQUE constraint here
        conn.execute(
            r#"
            INSERT INTO content_items (
                item_id, source, title, body, author, created_at, score, reply_count,
                permalink, language, translated_body, translation_backend,
                translation_confidence, contains_target_keywords, is_secondary_related,
                collected_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
            "#,
            params![
                record.item_id,
                record.source,
                record.title,
                record.body,
                record.author,
                record.created_at,
                record.score,
                record.reply_count,
                record.permalink,
                record.language,
                record.translated_body,
                record.translation_backend,
                record.translation_confidence,
                record.contains_target_keywords,
                record.is_secondary_related,
                now,
            ],
        )?;
        Ok(UpsertOutcome::Created)
    }

    fn upsert_reply_sync(
        conn: &Connection,
        reply: &ReplyRecord,
        item_id: &str,
        now: &str,
    ) -> anyhow::Result<UpsertOutcome> {
        if reply.reply_id.trim().is_empty() {
            return Err(PersistenceError::Integrity(format!(
                "reply under {} has a blank natural key",
                item_id
            ))
            .into());
        }

        // The owning item of a stored reply never changes
        let outcome = match Self::reply_owner(conn, &reply.reply_id)? {
            Some(owner) if owner != item_id => {
                return Err(PersistenceError::OrphanReply {
                    reply_id: reply.reply_id.clone(),
                    parent_id: item_id.to_string(),
                }
                .into());
            }
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Created,
        };

        conn.execute(
            r#"
            INSERT INTO reply_items (
                reply_id, item_id, parent_ref, author, body, created_at, score, language,
                translated_body, translation_backend, translation_confidence,
                is_secondary_related, collected_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
            ON CONFLICT(reply_id) DO UPDATE SET
                parent_ref = excluded.parent_ref,
                author = excluded.author,
                body = excluded.body,
                created_at = excluded.created_at,
                score = excluded.score,
                language = excluded.language,
                translated_body = excluded.translated_body,
                translation_backend = excluded.translation_backend,
                translation_confidence = excluded.translation_confidence,
                is_secondary_related = excluded.is_secondary_related,
                updated_at = excluded.updated_at
            "#,
            params![
                reply.reply_id,
                item_id,
                reply.parent_ref,
                reply.author,
                reply.body,
                reply.created_at,
                reply.score,
                reply.language,
                reply.translated_body,
                reply.translation_backend,
                reply.translation_confidence,
                reply.is_secondary_related,
                now,
            ],
        )?;

        Ok(outcome)
    }

    /// Upsert a batch, one transaction per record
    ///
    /// Never fails as a whole: blank keys are skipped and failing records are
    /// counted as errors.
    pub async fn bulk_upsert(&self, records: &[ContentRecord]) -> RunStatistics {
        let mut stats = RunStatistics::default();
        let total = records.len();

        for (index, record) in records.iter().enumerate() {
            if record.item_id.trim().is_empty() {
                warn!("Skipping record from '{}' without a natural key", record.source);
                stats.record_skipped(record);
            } else {
                match self.upsert(record).await {
                    Ok(outcome) => {
                        debug!("{} {}", outcome, record.item_id);
                        stats.record_saved(record, outcome);
                    }
                    Err(e) if e.is_record_level() => {
                        warn!("Record {} rolled back: {}", record.item_id, e);
                        stats.record_error(record);
                    }
                    Err(e) => {
                        error!("Failed to persist {}: {}", record.item_id, e);
                        stats.record_error(record);
                    }
                }
            }

            if (index + 1) % PROGRESS_INTERVAL == 0 {
                info!("Persisted {}/{} records", index + 1, total);
            }
        }

        info!(
            "Persistence finished: {} saved, {} updated, {} skipped, {} errors",
            stats.saved, stats.updated, stats.skipped, stats.errors
        );
        stats
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Load a stored item together with its replies
    pub async fn get_item(&self, item_id: &str) -> PersistenceResult<Option<ContentRecord>> {
        let item_id = item_id.to_string();

        let record = self
            .db
            .execute_async(move |conn| {
                let record = conn
                    .query_row(
                        r#"
                        SELECT item_id, source, title, body, author, created_at, score,
                               reply_count, permalink, language, translated_body,
                               translation_backend, translation_confidence,
                               contains_target_keywords, is_secondary_related
                        FROM content_items WHERE item_id = ?1
                        "#,
                        [&item_id],
                        |row| {
                            Ok(ContentRecord {
                                item_id: row.get(0)?,
                                source: row.get(1)?,
                                title: row.get(2)?,
                                body: row.get(3)?,
                                author: row.get(4)?,
                                created_at: row.get(5)?,
                                score: row.get(6)?,
                                reply_count: row.get(7)?,
                                permalink: row.get(8)?,
                                language: row.get(9)?,
                                translated_body: row.get(10)?,
                                translation_backend: row.get(11)?,
                                translation_confidence: row.get(12)?,
                                contains_target_keywords: row.get(13)?,
                                is_secondary_related: row.get(14)?,
                                replies: Vec::new(),
                            })
                        },
                    )
                    .optional()?;

                let Some(mut record) = record else {
                    return Ok(None);
                };

                let mut stmt = conn.prepare(
                    r#"
                    SELECT reply_id, item_id, parent_ref, author, body, created_at, score,
                           language, translated_body, translation_backend,
                           translation_confidence, is_secondary_related
                    FROM reply_items WHERE item_id = ?1 ORDER BY id
                    "#,
                )?;
                let replies = stmt
                    .query_map([&item_id], |row| {
                        Ok(ReplyRecord {
                            reply_id: row.get(0)?,
                            item_id: row.get(1)?,
                            parent_ref: row.get(2)?,
                            author: row.get(3)?,
                            body: row.get(4)?,
                            created_at: row.get(5)?,
                            score: row.get(6)?,
                            language: row.get(7)?,
                            translated_body: row.get(8)?,
                            translation_backend: row.get(9)?,
                            translation_confidence: row.get(10)?,
                            is_secondary_related: row.get(11)?,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                record.replies = replies;
                Ok(Some(record))
            })
            .await?;

        Ok(record)
    }

    /// Totals and breakdowns over the whole store
    pub async fn collection_stats(&self) -> PersistenceResult<CollectionStats> {
        let stats = self
            .db
            .execute_async(|conn| {
                let count = |sql: &str| -> rusqlite::Result<i64> { conn.query_row(sql, [], |row| row.get(0)) };

                let mut stats = CollectionStats {
                    total_items: count("SELECT COUNT(*) FROM content_items")?,
                    total_replies: count("SELECT COUNT(*) FROM reply_items")?,
                    translated_items: count(
                        "SELECT COUNT(*) FROM content_items WHERE translated_body IS NOT NULL",
                    )?,
                    keyword_items: count(
                        "SELECT COUNT(*) FROM content_items WHERE contains_target_keywords = 1",
                    )?,
                    ..Default::default()
                };

                let mut stmt = conn.prepare("SELECT source, COUNT(*) FROM content_items GROUP BY source")?;
                for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))? {
                    let (source, n) = row?;
                    stats.by_source.insert(source, n);
                }

                let mut stmt = conn.prepare("SELECT language, COUNT(*) FROM content_items GROUP BY language")?;
                for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))? {
                    let (language, n) = row?;
                    stats.by_language.insert(language, n);
                }

                Ok(stats)
            })
            .await?;

        Ok(stats)
    }
}
