/*!
 * Common test utilities for the polyharvest test suite
 */

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use polyharvest::app_config::CollectionConfig;
use polyharvest::errors::SourceError;
use polyharvest::providers::TranslationBackend;
use polyharvest::providers::mock::{MockBackend, MockRequest};
use polyharvest::sources::{RawItem, RawReply, SourceConnector};
use polyharvest::translation::{TranslationCache, TranslationOrchestrator, WhatlangDetector};

/// Route library logs through env_logger; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// A scripted source in a [`ScriptedConnector`]
enum ScriptedSource {
    Items(Vec<RawItem>),
    Failing(String),
}

/// In-memory connector whose sources either serve items or fail
#[derive(Default)]
pub struct ScriptedConnector {
    order: Vec<String>,
    sources: HashMap<String, ScriptedSource>,
    replies: HashMap<String, Vec<RawReply>>,
    fetches: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, source: &str, items: Vec<RawItem>) -> Self {
        self.order.push(source.to_string());
        self.sources.insert(source.to_string(), ScriptedSource::Items(items));
        self
    }

    pub fn with_failure(mut self, source: &str, message: &str) -> Self {
        self.order.push(source.to_string());
        self.sources
            .insert(source.to_string(), ScriptedSource::Failing(message.to_string()));
        self
    }

    pub fn with_replies(mut self, item_id: &str, replies: Vec<RawReply>) -> Self {
        self.replies.insert(item_id.to_string(), replies);
        self
    }

    /// Shared counter of `fetch_items` calls
    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        self.fetches.clone()
    }
}

#[async_trait]
impl SourceConnector for ScriptedConnector {
    fn name(&self) -> &str {
        "scripted"
    }

    fn list_sources(&self) -> Vec<String> {
        self.order.clone()
    }

    async fn fetch_items(&self, source: &str, _page_size: usize) -> Result<Vec<RawItem>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.sources.get(source) {
            Some(ScriptedSource::Items(items)) => Ok(items.clone()),
            Some(ScriptedSource::Failing(message)) => Err(SourceError::RequestFailed(message.clone())),
            None => Err(SourceError::NotFound(source.to_string())),
        }
    }

    async fn fetch_replies(&self, _source: &str, item_id: &str, limit: usize) -> Result<Vec<RawReply>, SourceError> {
        Ok(self
            .replies
            .get(item_id)
            .map(|replies| replies.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// A raw item with only an id and a body
pub fn raw_item(id: &str, body: &str) -> RawItem {
    RawItem {
        id: id.to_string(),
        title: String::new(),
        body: body.to_string(),
        author: Some("poster".to_string()),
        created_at: 1_700_000_000,
        score: 1,
        reply_count: 0,
        permalink: format!("/comments/{}/", id),
        lang_hint: None,
    }
}

pub fn raw_reply(id: &str, item_id: &str, body: &str) -> RawReply {
    RawReply {
        id: id.to_string(),
        item_id: item_id.to_string(),
        parent_ref: Some(format!("t3_{}", item_id)),
        author: None,
        body: body.to_string(),
        created_at: 1_700_000_100,
        score: 0,
    }
}

/// Collection settings without courtesy delays
pub fn fast_settings() -> CollectionConfig {
    CollectionConfig {
        item_delay_ms: 0,
        source_delay_ms: 0,
        ..CollectionConfig::default()
    }
}

/// Canned Spanish to English translations, echo otherwise
pub fn phrasebook(request: &MockRequest) -> String {
    match request.text.as_str() {
        "Necesito información sobre VIH" => "I need information about HIV".to_string(),
        "¿Dónde puedo conseguir PrEP en Toronto sin seguro médico?" => {
            "Where can I get PrEP in Toronto without health insurance?".to_string()
        }
        "Acabo de llegar a Canadá y no conozco el sistema de salud" => {
            "I just moved here to Canada and don't know the system".to_string()
        }
        other => format!("[en] {}", other),
    }
}

/// Detector restricted to English and Spanish
pub fn english_spanish_detector() -> WhatlangDetector {
    WhatlangDetector::new(&["en".to_string(), "es".to_string()])
}

/// Orchestrator over the given backends with an in-memory cache
pub fn orchestrator_with(backends: Vec<MockBackend>) -> TranslationOrchestrator {
    let backends: Vec<Arc<dyn TranslationBackend>> = backends
        .into_iter()
        .map(|backend| Arc::new(backend) as Arc<dyn TranslationBackend>)
        .collect();

    TranslationOrchestrator::new(
        backends,
        Arc::new(TranslationCache::in_memory()),
        Box::new(english_spanish_detector()),
    )
}
