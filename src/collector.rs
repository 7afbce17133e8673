/*!
 * Collection controller.
 *
 * Walks the configured sources in order. Each source moves through
 * `Pending -> Fetching -> Filtering -> (Translating) -> Normalized`, or ends
 * in `Failed` when its fetch fails. A failed source is recorded and the run
 * moves on to the next one.
 *
 * Per item: match the raw text, discard it when nothing matched and no
 * translation applies, otherwise translate (non-target languages only),
 * re-match the translation and assemble a [`ContentRecord`].
 */

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::app_config::{CollectionConfig, Config};
use crate::database::{ContentRecord, ReplyRecord, Repository};
use crate::keywords::KeywordMatcher;
use crate::language_utils::{self, UNKNOWN_LANGUAGE};
use crate::sources::{normalize_author, RawItem, RawReply, SourceConnector};
use crate::translation::{TranslationOrchestrator, TranslationResult};

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static MENTION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/?\b[ur]/[A-Za-z0-9_-]+").unwrap());
static REMOVED_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(deleted|removed)\]").unwrap());
static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Strip links, user/community mentions and removal markers
///
/// Used for detection and translation input; stored bodies stay raw.
pub fn clean_text(text: &str) -> String {
    let text = URL_PATTERN.replace_all(text, " ");
    let text = MENTION_PATTERN.replace_all(&text, " ");
    let text = REMOVED_PATTERN.replace_all(&text, " ");
    WHITESPACE_PATTERN.replace_all(&text, " ").trim().to_string()
}

/// Lifecycle of one source within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceState {
    Pending,
    Fetching,
    Filtering,
    Translating,
    Normalized,
    Failed,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceState::Pending => "PENDING",
            SourceState::Fetching => "FETCHING",
            SourceState::Filtering => "FILTERING",
            SourceState::Translating => "TRANSLATING",
            SourceState::Normalized => "NORMALIZED",
            SourceState::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// What happened to one source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    pub state: SourceState,
    /// Items returned by the connector (after the per-source cap)
    pub fetched: usize,
    /// Items whose original or translated text matched
    pub matched: usize,
    /// Items dropped without a record
    pub discarded: usize,
    /// Items already in the store and not processed again
    pub skipped_existing: usize,
    /// Items that received a translation
    pub translated: usize,
    /// Items whose translation failed on every backend
    pub translation_failed: usize,
    /// Records assembled
    pub records: usize,
    /// Replies attached to those records
    pub replies: usize,
    /// Failure reason when `state` is `Failed`
    pub error: Option<String>,
}

impl SourceOutcome {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            state: SourceState::Pending,
            fetched: 0,
            matched: 0,
            discarded: 0,
            skipped_existing: 0,
            translated: 0,
            translation_failed: 0,
            records: 0,
            replies: 0,
            error: None,
        }
    }

    fn transition(&mut self, next: SourceState) {
        if self.state != next {
            debug!("Source '{}': {} -> {}", self.source, self.state, next);
            self.state = next;
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == SourceState::Failed
    }
}

/// Result of a collection run
#[derive(Debug, Clone, Default)]
pub struct CollectionSummary {
    /// One outcome per configured source, in configured order
    pub outcomes: Vec<SourceOutcome>,
    /// Normalized records, feed order within a source
    pub records: Vec<ContentRecord>,
}

impl CollectionSummary {
    pub fn failed_sources(&self) -> Vec<&SourceOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed()).collect()
    }

    /// Every source failed (and there was at least one)
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(SourceOutcome::is_failed)
    }

    /// Already-stored items per source, for the persistence statistics
    pub fn skipped_by_source(&self) -> BTreeMap<String, usize> {
        self.outcomes
            .iter()
            .filter(|o| o.skipped_existing > 0)
            .map(|o| (o.source.clone(), o.skipped_existing))
            .collect()
    }

    pub fn language_distribution(&self) -> BTreeMap<String, usize> {
        let mut distribution = BTreeMap::new();
        for record in &self.records {
            *distribution.entry(record.language.clone()).or_insert(0) += 1;
        }
        distribution
    }
}

/// Composes a connector, a keyword matcher and the translation orchestrator
pub struct Collector {
    matcher: KeywordMatcher,
    connector: Box<dyn SourceConnector>,
    orchestrator: Arc<TranslationOrchestrator>,
    /// Used only to skip already-stored items
    repository: Option<Repository>,
    settings: CollectionConfig,
    target_language: String,
    translation_enabled: bool,
    page_size: usize,
    show_progress: bool,
}

impl Collector {
    pub fn new(
        matcher: KeywordMatcher,
        connector: Box<dyn SourceConnector>,
        orchestrator: Arc<TranslationOrchestrator>,
        settings: CollectionConfig,
        target_language: &str,
    ) -> Self {
        Self {
            matcher,
            connector,
            orchestrator,
            repository: None,
            settings,
            target_language: target_language.to_string(),
            translation_enabled: true,
            page_size: 100,
            show_progress: false,
        }
    }

    /// Build a collector from the application configuration
    pub fn from_config(
        config: &Config,
        matcher: KeywordMatcher,
        connector: Box<dyn SourceConnector>,
        orchestrator: Arc<TranslationOrchestrator>,
    ) -> Self {
        let mut collector = Self::new(
            matcher,
            connector,
            orchestrator,
            config.collection.clone(),
            &config.target_language,
        );
        collector.translation_enabled = config.translation.enabled;
        collector.page_size = config.connector.page_size;
        collector
    }

    pub fn with_repository(mut self, repository: Repository) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_translation(mut self, enabled: bool) -> Self {
        self.translation_enabled = enabled;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn matcher(&self) -> &KeywordMatcher {
        &self.matcher
    }

    pub fn orchestrator(&self) -> &Arc<TranslationOrchestrator> {
        &self.orchestrator
    }

    /// Collect every source in the given order
    ///
    /// An empty list falls back to the connector's own sources.
    pub async fn collect(&self, sources: &[String]) -> CollectionSummary {
        let sources = if sources.is_empty() {
            self.connector.list_sources()
        } else {
            sources.to_vec()
        };

        info!(
            "Collecting {} sources via {} connector",
            sources.len(),
            self.connector.name()
        );

        let progress = self.progress_bar(sources.len() as u64);
        let mut summary = CollectionSummary::default();

        for (index, source) in sources.iter().enumerate() {
            progress.set_message(source.clone());

            let (outcome, records) = self.collect_source(source).await;
            if outcome.is_failed() {
                error!(
                    "Source '{}' failed: {}",
                    source,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            } else {
                info!(
                    "Source '{}': {} fetched, {} matched, {} records, {} discarded, {} skipped",
                    source,
                    outcome.fetched,
                    outcome.matched,
                    outcome.records,
                    outcome.discarded,
                    outcome.skipped_existing
                );
            }

            summary.outcomes.push(outcome);
            summary.records.extend(records);
            progress.inc(1);

            if index + 1 < sources.len() {
                pause(self.settings.source_delay_ms).await;
            }
        }

        progress.finish_and_clear();
        summary
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sources ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style.progress_chars("█▓▒░"));
        progress
    }

    async fn collect_source(&self, source: &str) -> (SourceOutcome, Vec<ContentRecord>) {
        let mut outcome = SourceOutcome::new(source);
        let mut records = Vec::new();

        outcome.transition(SourceState::Fetching);
        let mut items = match self.connector.fetch_items(source, self.page_size).await {
            Ok(items) => items,
            Err(e) => {
                outcome.error = Some(e.to_string());
                outcome.transition(SourceState::Failed);
                return (outcome, records);
            }
        };
        items.truncate(self.settings.fetch_limit());
        outcome.fetched = items.len();

        let existing = self.existing_keys(&items).await;

        outcome.transition(SourceState::Filtering);
        for item in &items {
            if outcome.records >= self.settings.max_items_per_source {
                debug!("Reached {} records for {}", outcome.records, source);
                break;
            }
            if existing.contains(&item.id) {
                outcome.skipped_existing += 1;
                continue;
            }

            if let Some(record) = self.process_item(source, item, &mut outcome).await {
                outcome.records += 1;
                outcome.replies += record.replies.len();
                records.push(record);
            }

            pause(self.settings.item_delay_ms).await;
        }

        outcome.transition(SourceState::Normalized);
        (outcome, records)
    }

    async fn existing_keys(&self, items: &[RawItem]) -> HashSet<String> {
        let Some(repository) = self.repository.as_ref().filter(|_| self.settings.skip_existing) else {
            return HashSet::new();
        };

        let keys: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        match repository.existing_keys(&keys).await {
            Ok(found) => found,
            Err(e) => {
                // Skipping is an optimization; upserts stay correct without it
                warn!("Could not look up stored items, processing all: {}", e);
                HashSet::new()
            }
        }
    }

    /// Language of an item: a resolvable source hint wins over detection
    fn item_language(&self, item: &RawItem, cleaned: &str) -> String {
        item.lang_hint
            .as_deref()
            .and_then(language_utils::resolve_language_hint)
            .unwrap_or_else(|| self.orchestrator.detect_language(cleaned))
    }

    fn needs_translation(&self, language: &str) -> bool {
        self.translation_enabled
            && language != UNKNOWN_LANGUAGE
            && !language_utils::language_codes_match(language, &self.target_language)
    }

    async fn process_item(
        &self,
        source: &str,
        item: &RawItem,
        outcome: &mut SourceOutcome,
    ) -> Option<ContentRecord> {
        let text = item.full_text();
        let cleaned = clean_text(&text);
        let language = self.item_language(item, &cleaned);

        let original_match = self.matcher.contains_topic_keywords(&text, &language);
        let translate = self.needs_translation(&language);

        if !original_match && !translate {
            debug!("Discarding {} ({}): no keyword match", item.id, language);
            outcome.discarded += 1;
            return None;
        }

        let mut translation: Option<TranslationResult> = None;
        if translate {
            outcome.transition(SourceState::Translating);
            let result = self
                .orchestrator
                .translate(&cleaned, &self.target_language, &language)
                .await;

            if result.is_translated() {
                outcome.translated += 1;
                translation = Some(result);
            } else if result.is_failed() {
                outcome.translation_failed += 1;
                warn!(
                    "No translation for {}: {}",
                    item.id,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            outcome.transition(SourceState::Filtering);
        }

        let translated_body = translation.as_ref().map(|t| t.text.clone());
        let matches = self
            .matcher
            .matches_record(&text, translated_body.as_deref(), &language);
        if matches.matched() {
            outcome.matched += 1;
        }

        let is_secondary_related = self.matcher.is_secondary_related(&text)
            || translated_body
                .as_deref()
                .is_some_and(|t| self.matcher.is_secondary_related(t));

        let replies = if matches.matched() && self.settings.collect_replies {
            self.collect_replies(source, &item.id).await
        } else {
            Vec::new()
        };

        Some(ContentRecord {
            item_id: item.id.clone(),
            source: source.to_string(),
            title: item.title.clone(),
            body: item.body.clone(),
            author: Some(normalize_author(item.author.as_deref())),
            created_at: item.created_at,
            score: item.score,
            reply_count: item.reply_count,
            permalink: item.permalink.clone(),
            language,
            translated_body,
            translation_backend: translation.as_ref().map(|t| t.backend_used.clone()),
            translation_confidence: translation.as_ref().map(|t| t.confidence),
            contains_target_keywords: matches.matched(),
            is_secondary_related,
            replies,
        })
    }

    async fn collect_replies(&self, source: &str, item_id: &str) -> Vec<ReplyRecord> {
        let raw = match self
            .connector
            .fetch_replies(source, item_id, self.settings.max_replies_per_item)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not fetch replies of {}: {}", item_id, e);
                return Vec::new();
            }
        };

        let mut replies = Vec::new();
        for reply in raw {
            if let Some(record) = self.process_reply(item_id, reply).await {
                replies.push(record);
            }
        }
        debug!("{} replies kept for {}", replies.len(), item_id);
        replies
    }

    async fn process_reply(&self, item_id: &str, reply: RawReply) -> Option<ReplyRecord> {
        let cleaned = clean_text(&reply.body);
        let length = cleaned.chars().count();
        if length < self.settings.min_reply_length {
            return None;
        }

        let language = self.orchestrator.detect_language(&cleaned);

        let mut translation = None;
        if length >= self.settings.reply_translation_min_length && self.needs_translation(&language) {
            let result = self
                .orchestrator
                .translate(&cleaned, &self.target_language, &language)
                .await;
            if result.is_translated() {
                translation = Some(result);
            }
        }

        let translated_body = translation.as_ref().map(|t| t.text.clone());
        let is_secondary_related = self.matcher.is_secondary_related(&reply.body)
            || translated_body
                .as_deref()
                .is_some_and(|t| self.matcher.is_secondary_related(t));

        Some(ReplyRecord {
            reply_id: reply.id,
            item_id: item_id.to_string(),
            parent_ref: reply.parent_ref,
            author: Some(normalize_author(reply.author.as_deref())),
            body: reply.body,
            created_at: reply.created_at,
            score: reply.score,
            language,
            translated_body,
            translation_backend: translation.as_ref().map(|t| t.backend_used.clone()),
            translation_confidence: translation.as_ref().map(|t| t.confidence),
            is_secondary_related,
        })
    }
}

async fn pause(millis: u64) {
    if millis > 0 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}
