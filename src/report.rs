/*!
 * Run report: the JSON document written once per collection run.
 */

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::collector::{CollectionSummary, SourceState};
use crate::database::RunStatistics;
use crate::file_utils::FileManager;
use crate::translation::{CacheStats, TranslationStats};

/// How many sources the log summary ranks
const TOP_SOURCES: usize = 5;

/// Per-source line of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: String,
    pub state: String,
    pub fetched: usize,
    pub records: usize,
    pub matched: usize,
    pub translated: usize,
    /// Records kept with their original text after every backend failed
    pub translation_failed: usize,
    pub discarded: usize,
    pub skipped_existing: usize,
    pub replies: usize,
    /// Distinct languages among the source's records
    pub languages_found: usize,
    pub error: Option<String>,
}

impl SourceReport {
    /// Ranking used for the "most multilingual sources" summary
    pub fn multilingual_score(&self) -> usize {
        self.languages_found * self.records + self.translated * 2
    }
}

/// Translation section of the report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationReport {
    pub requests: usize,
    pub translated: usize,
    pub cached: usize,
    pub passthrough: usize,
    pub failed: usize,
    /// Fraction in `[0, 1]` of attempted translations that produced text
    pub success_rate: f64,
    pub backend_usage: BTreeMap<String, usize>,
    /// Translation cache counters for this process
    pub cache: Option<CacheStats>,
    /// Heuristic backend confidences, not measured accuracy
    pub average_confidence: Option<f64>,
    pub min_confidence: Option<f64>,
    pub max_confidence: Option<f64>,
}

impl From<&TranslationStats> for TranslationReport {
    fn from(stats: &TranslationStats) -> Self {
        Self {
            requests: stats.requests,
            translated: stats.translated,
            cached: stats.cached,
            passthrough: stats.passthrough,
            failed: stats.failed,
            success_rate: stats.success_rate(),
            backend_usage: stats.backend_usage.clone(),
            cache: None,
            average_confidence: stats.average_confidence(),
            min_confidence: stats.confidence_min,
            max_confidence: stats.confidence_max,
        }
    }
}

/// A source that ended in the failed state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedSource {
    pub source: String,
    pub error: String,
}

/// Structured summary of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub total_sources: usize,
    pub successful_sources: usize,
    pub total_records: usize,
    pub total_replies: usize,
    pub keyword_records: usize,
    pub secondary_records: usize,
    pub language_distribution: BTreeMap<String, usize>,
    pub translation: TranslationReport,
    pub sources: Vec<SourceReport>,
    pub failed_sources: Vec<FailedSource>,
    /// Absent when nothing was persisted (dry run)
    pub persistence: Option<RunStatistics>,
}

impl RunReport {
    /// Assemble the report; the run is considered finished now
    pub fn build(
        started_at: DateTime<Utc>,
        summary: &CollectionSummary,
        translation: &TranslationStats,
        persistence: Option<&RunStatistics>,
    ) -> Self {
        let finished_at = Utc::now();

        let sources: Vec<SourceReport> = summary
            .outcomes
            .iter()
            .map(|outcome| {
                let languages: BTreeSet<&str> = summary
                    .records
                    .iter()
                    .filter(|r| r.source == outcome.source)
                    .map(|r| r.language.as_str())
                    .collect();

                SourceReport {
                    source: outcome.source.clone(),
                    state: outcome.state.to_string(),
                    fetched: outcome.fetched,
                    records: outcome.records,
                    matched: outcome.matched,
                    translated: outcome.translated,
                    translation_failed: outcome.translation_failed,
                    discarded: outcome.discarded,
                    skipped_existing: outcome.skipped_existing,
                    replies: outcome.replies,
                    languages_found: languages.len(),
                    error: outcome.error.clone(),
                }
            })
            .collect();

        let failed_sources = summary
            .outcomes
            .iter()
            .filter(|o| o.state == SourceState::Failed)
            .map(|o| FailedSource {
                source: o.source.clone(),
                error: o.error.clone().unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at,
            finished_at,
            duration_secs: (finished_at - started_at).num_milliseconds().max(0) as f64 / 1000.0,
            total_sources: summary.outcomes.len(),
            successful_sources: summary.outcomes.len() - failed_sources.len(),
            total_records: summary.records.len(),
            total_replies: summary.records.iter().map(|r| r.replies.len()).sum(),
            keyword_records: summary.records.iter().filter(|r| r.contains_target_keywords).count(),
            secondary_records: summary.records.iter().filter(|r| r.is_secondary_related).count(),
            language_distribution: summary.language_distribution(),
            translation: TranslationReport::from(translation),
            sources,
            failed_sources,
            persistence: persistence.cloned(),
        }
    }

    /// Attach the translation cache counters
    pub fn with_cache(mut self, stats: CacheStats) -> Self {
        self.translation.cache = Some(stats);
        self
    }

    /// File name for this report, e.g. `collection_report_20240101_120000.json`
    pub fn file_name(&self) -> String {
        format!("collection_report_{}.json", self.finished_at.format("%Y%m%d_%H%M%S"))
    }

    /// Write the report as pretty JSON under `dir`
    pub fn write<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        FileManager::ensure_dir(dir)?;

        let path = dir.join(self.file_name());
        FileManager::write_json_atomic(&path, self)
            .with_context(|| format!("Failed to write run report {:?}", path))?;

        info!("Collection report saved to {:?}", path);
        Ok(path)
    }

    /// Log a human-readable summary of the run
    pub fn log_summary(&self) {
        info!("Collection complete in {:.1}s (run {})", self.duration_secs, self.run_id);
        info!("  Records: {} ({} replies)", self.total_records, self.total_replies);
        info!("  Sources: {}/{} succeeded", self.successful_sources, self.total_sources);
        info!("  Keyword matches: {}", self.keyword_records);
        info!("  Newcomer-related: {}", self.secondary_records);

        let mut languages: Vec<(&String, &usize)> = self.language_distribution.iter().collect();
        languages.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (language, count) in languages {
            let share = if self.total_records > 0 {
                *count as f64 / self.total_records as f64 * 100.0
            } else {
                0.0
            };
            info!("  {}: {} records ({:.1}%)", language, count, share);
        }

        if self.translation.translated + self.translation.cached + self.translation.failed > 0 {
            info!(
                "  Translation success rate: {:.1}% ({} live, {} cached, {} failed)",
                self.translation.success_rate * 100.0,
                self.translation.translated,
                self.translation.cached,
                self.translation.failed
            );
        }

        if let Some(cache) = &self.translation.cache {
            info!(
                "  Cache: {} hits, {} misses ({:.1}% hit rate), {} entries",
                cache.hits,
                cache.misses,
                cache.hit_rate * 100.0,
                cache.entries
            );
        }

        let mut ranked: Vec<&SourceReport> = self.sources.iter().filter(|s| s.records > 0).collect();
        ranked.sort_by(|a, b| b.multilingual_score().cmp(&a.multilingual_score()));
        for source in ranked.iter().take(TOP_SOURCES) {
            info!(
                "  {}: {} records, {} languages, {} translations",
                source.source, source.records, source.languages_found, source.translated
            );
        }

        if let Some(persistence) = &self.persistence {
            info!(
                "  Stored: {} saved, {} updated, {} skipped, {} errors",
                persistence.saved, persistence.updated, persistence.skipped, persistence.errors
            );
        }

        for failed in &self.failed_sources {
            warn!("  Failed source {}: {}", failed.source, failed.error);
        }
    }
}
