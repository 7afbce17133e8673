/*!
 * Integration tests for the collection controller over scripted sources
 */

use std::sync::Arc;
use std::sync::atomic::Ordering;

use polyharvest::app_config::CollectionConfig;
use polyharvest::collector::{Collector, SourceState};
use polyharvest::keywords::KeywordMatcher;
use polyharvest::providers::mock::MockBackend;

use crate::common::{self, ScriptedConnector, fast_settings, orchestrator_with, phrasebook, raw_item, raw_reply};

fn collector(connector: ScriptedConnector, backend: MockBackend, settings: CollectionConfig) -> Collector {
    Collector::new(
        KeywordMatcher::with_defaults("en"),
        Box::new(connector),
        Arc::new(orchestrator_with(vec![backend])),
        settings,
        "en",
    )
}

fn sources(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[tokio::test]
async fn test_collect_withFailingMiddleSource_shouldContinueWithTheRest() {
    common::init_logging();
    let connector = ScriptedConnector::new()
        .with_items("askTO", vec![raw_item("a1", "Where can I get tested for HIV downtown?")])
        .with_failure("toronto", "HTTP 503")
        .with_items("ontario", vec![raw_item("o1", "Is PrEP covered by OHIP these days?")]);
    let fetches = connector.fetch_counter();
    let collector = collector(connector, MockBackend::working("google"), fast_settings());

    let summary = collector.collect(&sources(&["askTO", "toronto", "ontario"])).await;

    assert_eq!(fetches.load(Ordering::SeqCst), 3);
    assert!(!summary.all_failed());

    let states: Vec<SourceState> = summary.outcomes.iter().map(|o| o.state).collect();
    assert_eq!(states, vec![SourceState::Normalized, SourceState::Failed, SourceState::Normalized]);

    let failed = summary.failed_sources();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].source, "toronto");
    assert!(failed[0].error.as_deref().unwrap_or_default().contains("HTTP 503"));

    let ids: Vec<&str> = summary.records.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "o1"]);
    assert_eq!(summary.records[1].source, "ontario");
}

#[tokio::test]
async fn test_collect_withEverySourceFailing_shouldReportAllFailed() {
    let connector = ScriptedConnector::new()
        .with_failure("askTO", "connection reset")
        .with_failure("toronto", "HTTP 429");
    let collector = collector(connector, MockBackend::working("google"), fast_settings());

    let summary = collector.collect(&sources(&["askTO", "toronto", "nowhere"])).await;

    assert!(summary.all_failed());
    assert_eq!(summary.outcomes.len(), 3);
    assert!(summary.records.is_empty());
}

#[tokio::test]
async fn test_collect_withNoSourcesGiven_shouldUseConnectorOrder() {
    let connector = ScriptedConnector::new()
        .with_items("NewToCanada", vec![])
        .with_items("askTO", vec![]);
    let collector = collector(connector, MockBackend::working("google"), fast_settings());

    let summary = collector.collect(&[]).await;

    let order: Vec<&str> = summary.outcomes.iter().map(|o| o.source.as_str()).collect();
    assert_eq!(order, vec!["NewToCanada", "askTO"]);
    assert!(summary.outcomes.iter().all(|o| o.state == SourceState::Normalized));
}

#[tokio::test]
async fn test_collect_withFailingTranslation_shouldKeepOriginalMatch() {
    let connector = ScriptedConnector::new()
        .with_items("askTO", vec![raw_item("s1", "Necesito información sobre VIH")]);
    let collector = collector(connector, MockBackend::failing("google"), fast_settings());

    let summary = collector.collect(&sources(&["askTO"])).await;

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.state, SourceState::Normalized);
    assert_eq!(outcome.translation_failed, 1);
    assert_eq!(outcome.translated, 0);

    let record = &summary.records[0];
    assert_eq!(record.language, "es");
    assert!(record.translated_body.is_none());
    assert!(record.translation_backend.is_none());
    assert!(record.contains_target_keywords);
}

#[tokio::test]
async fn test_collect_withTranslatedNewcomerPost_shouldKeepUnflaggedRecord() {
    let connector = ScriptedConnector::new().with_items(
        "NewToCanada",
        vec![raw_item("n1", "Acabo de llegar a Canadá y no conozco el sistema de salud")],
    );
    let backend = MockBackend::working("google").with_custom_response(phrasebook);
    let collector = collector(connector, backend, fast_settings());

    let summary = collector.collect(&sources(&["NewToCanada"])).await;

    let record = &summary.records[0];
    assert_eq!(record.language, "es");
    assert_eq!(
        record.translated_body.as_deref(),
        Some("I just moved here to Canada and don't know the system")
    );
    assert!(!record.contains_target_keywords);
    assert!(record.is_secondary_related);
    assert!(record.replies.is_empty());
}

#[tokio::test]
async fn test_collect_withReplies_shouldFilterAndTranslateThem() {
    let connector = ScriptedConnector::new()
        .with_items(
            "askTO",
            vec![
                raw_item("a1", "Where can I get tested for HIV downtown?"),
                raw_item("a2", "What are the best brunch spots downtown this weekend?"),
            ],
        )
        .with_replies(
            "a1",
            vec![
                raw_reply("c1", "a1", "same"),
                raw_reply("c2", "a1", "Acabo de llegar a Canadá y no conozco el sistema de salud"),
                raw_reply("c3", "a1", "The Hassle Free clinic on Church street does anonymous testing"),
            ],
        )
        .with_replies("a2", vec![raw_reply("c9", "a2", "Try the place on Queen street west")]);
    let backend = MockBackend::working("google").with_custom_response(phrasebook);
    let collector = collector(connector, backend, fast_settings());

    let summary = collector.collect(&sources(&["askTO"])).await;

    assert_eq!(summary.outcomes[0].discarded, 1);
    assert_eq!(summary.outcomes[0].replies, 2);
    assert_eq!(summary.records.len(), 1);

    let replies = &summary.records[0].replies;
    let ids: Vec<&str> = replies.iter().map(|r| r.reply_id.as_str()).collect();
    assert_eq!(ids, vec!["c2", "c3"]);

    assert_eq!(replies[0].language, "es");
    assert_eq!(replies[0].translation_backend.as_deref(), Some("google"));
    assert!(replies[0].is_secondary_related);
    assert_eq!(replies[1].language, "en");
    assert!(replies[1].translated_body.is_none());
    assert_eq!(replies[1].author.as_deref(), Some("[deleted]"));
}

#[tokio::test]
async fn test_collect_withItemCap_shouldCapRelevantRecords() {
    let mut items = vec![
        raw_item("x0", "Best patio for brunch this weekend?"),
        raw_item("x1", "What are the best brunch spots downtown this weekend?"),
    ];
    items.extend((0..5).map(|i| raw_item(&format!("h{}", i), "Question about HIV testing near me")));
    let connector = ScriptedConnector::new().with_items("askTO", items);
    let settings = CollectionConfig {
        max_items_per_source: 2,
        ..fast_settings()
    };
    let collector = collector(connector, MockBackend::working("google"), settings);

    let summary = collector.collect(&sources(&["askTO"])).await;

    assert_eq!(summary.outcomes[0].fetched, 6);
    assert_eq!(summary.outcomes[0].discarded, 2);
    assert_eq!(summary.outcomes[0].records, 2);
    let ids: Vec<&str> = summary.records.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(ids, vec!["h0", "h1"]);
}

#[tokio::test]
async fn test_collect_withTranslationDisabled_shouldOnlyMatchOriginals() {
    let connector = ScriptedConnector::new().with_items(
        "askTO",
        vec![
            raw_item("s1", "Necesito información sobre VIH"),
            raw_item("s2", "Acabo de llegar a Canadá y no conozco el sistema de salud"),
        ],
    );
    let backend = MockBackend::working("google");
    let handle = backend.clone();
    let collector = collector(connector, backend, fast_settings()).with_translation(false);

    let summary = collector.collect(&sources(&["askTO"])).await;

    assert_eq!(handle.calls(), 0);
    assert_eq!(summary.outcomes[0].discarded, 1);
    let ids: Vec<&str> = summary.records.iter().map(|r| r.item_id.as_str()).collect();
    assert_eq!(ids, vec!["s1"]);
    assert!(summary.records[0].translated_body.is_none());
}
