/*!
 * Tests for the persistence layer against file-backed stores
 */

use std::collections::BTreeMap;

use polyharvest::database::{ContentRecord, ReplyRecord, Repository, RunStatistics, UpsertOutcome};
use polyharvest::errors::PersistenceError;

use crate::common;

fn record(item_id: &str, source: &str, language: &str) -> ContentRecord {
    ContentRecord {
        item_id: item_id.to_string(),
        source: source.to_string(),
        title: "Clinic question".to_string(),
        body: "Where can I get tested for HIV?".to_string(),
        author: Some("poster".to_string()),
        created_at: 1_700_000_000,
        score: 3,
        reply_count: 1,
        permalink: format!("/r/{}/comments/{}/", source, item_id),
        language: language.to_string(),
        translated_body: None,
        translation_backend: None,
        translation_confidence: None,
        contains_target_keywords: true,
        is_secondary_related: false,
        replies: Vec::new(),
    }
}

fn reply(reply_id: &str, item_id: &str, body: &str) -> ReplyRecord {
    ReplyRecord {
        reply_id: reply_id.to_string(),
        item_id: item_id.to_string(),
        parent_ref: Some(format!("t3_{}", item_id)),
        author: Some("helper".to_string()),
        body: body.to_string(),
        created_at: 1_700_000_100,
        score: 2,
        language: "en".to_string(),
        translated_body: None,
        translation_backend: None,
        translation_confidence: None,
        is_secondary_related: false,
    }
}

fn count_rows(repo: &Repository, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    repo.connection()
        .execute(|conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
        .unwrap()
}

#[tokio::test]
async fn test_bulkUpsert_rerunOnReopenedStore_shouldUpdateWithoutDuplicates() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("harvest.db");

    let mut item = record("p1", "askTO", "en");
    item.replies = vec![reply("c1", "p1", "The Hassle Free clinic does walk-ins")];
    let records = vec![item, record("p2", "toronto", "es")];

    {
        let repo = Repository::open(&path).unwrap();
        let first = repo.bulk_upsert(&records).await;
        assert_eq!(first.saved, 2);
        assert_eq!(first.replies_written, 1);
    }

    let repo = Repository::open(&path).unwrap();
    let second = repo.bulk_upsert(&records).await;

    assert_eq!(second.saved, 0);
    assert_eq!(second.updated, 2);
    assert_eq!(second.errors, 0);
    assert_eq!(count_rows(&repo, "content_items"), 2);
    assert_eq!(count_rows(&repo, "reply_items"), 1);
}

#[tokio::test]
async fn test_upsert_withChangedFields_shouldOverwriteStoredRow() {
    let repo = Repository::new_in_memory().unwrap();
    let mut item = record("p1", "askTO", "es");
    item.replies = vec![reply("c1", "p1", "first version of the answer")];
    repo.upsert(&item).await.unwrap();

    item.contains_target_keywords = false;
    item.translated_body = Some("Where can I get tested?".to_string());
    item.translation_backend = Some("google".to_string());
    item.translation_confidence = Some(0.9);
    item.replies[0].body = "edited answer".to_string();

    assert_eq!(repo.upsert(&item).await.unwrap(), UpsertOutcome::Updated);

    let stored = repo.get_item("p1").await.unwrap().unwrap();
    assert!(!stored.contains_target_keywords);
    assert_eq!(stored.translation_backend.as_deref(), Some("google"));
    assert_eq!(stored.translation_confidence, Some(0.9));
    assert_eq!(stored.replies.len(), 1);
    assert_eq!(stored.replies[0].body, "edited answer");
}

#[tokio::test]
async fn test_upsert_withBlankKey_shouldFailAsIntegrityError() {
    let repo = Repository::new_in_memory().unwrap();

    let result = repo.upsert(&record("", "askTO", "en")).await;

    assert!(matches!(result, Err(PersistenceError::Integrity(_))));
    assert_eq!(count_rows(&repo, "content_items"), 0);
}

#[tokio::test]
async fn test_upsert_withReplyOfAnotherItem_shouldRollBackParent() {
    let repo = Repository::new_in_memory().unwrap();
    let mut item = record("p1", "askTO", "en");
    item.replies = vec![
        reply("c1", "p1", "belongs here"),
        reply("c2", "p7", "belongs elsewhere"),
    ];

    let result = repo.upsert(&item).await;

    assert!(matches!(result, Err(PersistenceError::OrphanReply { .. })));
    assert!(!repo.exists("p1").await.unwrap());
    assert_eq!(count_rows(&repo, "reply_items"), 0);
}

#[tokio::test]
async fn test_existingKeys_withManyKeys_shouldQueryInChunks() {
    let repo = Repository::new_in_memory().unwrap();
    let records: Vec<ContentRecord> = (0..30).map(|i| record(&format!("p{}", i), "askTO", "en")).collect();
    repo.bulk_upsert(&records).await;

    let keys: Vec<String> = (0..1200).map(|i| format!("p{}", i)).collect();
    let found = repo.existing_keys(&keys).await.unwrap();

    assert_eq!(found.len(), 30);
    assert!(repo.existing_keys(&[]).await.unwrap().is_empty());
}

#[test]
fn test_withUpstreamSkips_shouldFoldIntoTotals() {
    let mut upstream = BTreeMap::new();
    upstream.insert("askTO".to_string(), 4);
    upstream.insert("toronto".to_string(), 0);

    let stats = RunStatistics::default().with_upstream_skips(&upstream);

    assert_eq!(stats.skipped, 4);
    assert_eq!(stats.total(), 4);
    assert_eq!(stats.by_source["askTO"].skipped, 4);
}
