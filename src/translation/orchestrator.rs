/*!
 * Translation orchestration: detection, cache, and ordered backend fallback.
 *
 * `translate` never fails. Every outcome, including "no backend could help",
 * is a [`TranslationResult`] whose `backend_used` says what happened:
 *
 * | backend_used     | meaning                                        |
 * |------------------|------------------------------------------------|
 * | `none`           | empty input or undetectable language           |
 * | `passthrough`    | text already in the target language            |
 * | `cache`          | served from the translation cache              |
 * | backend name     | produced by that backend                       |
 * | `failed`         | every backend failed; `error` is populated     |
 *
 * Confidence values are per-backend trust estimates (0.8 for the primary
 * backend, 0.7 for the fallback) unless a backend reports its own. They are
 * heuristics and must not be read as measured accuracy.
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;

use crate::app_config::Config;
use crate::language_utils::{self, AUTO_LANGUAGE, UNKNOWN_LANGUAGE};
use crate::providers::{self, TranslationBackend};
use crate::translation::cache::TranslationCache;
use crate::translation::detection::{LanguageDetector, WhatlangDetector};

pub const BACKEND_NONE: &str = "none";
pub const BACKEND_PASSTHROUGH: &str = "passthrough";
pub const BACKEND_CACHE: &str = "cache";
pub const BACKEND_FAILED: &str = "failed";

/// Texts shorter than this (in characters, after trimming) are not detected
pub const MIN_DETECTION_CHARS: usize = 10;

/// Outcome of a translation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationResult {
    /// Translated text, or the input when nothing was translated
    pub text: String,
    /// Resolved source language (`unknown` when detection failed)
    pub source_lang: String,
    /// Target language
    pub target_lang: String,
    /// See the module table
    pub backend_used: String,
    /// Heuristic confidence in `[0, 1]`
    pub confidence: f64,
    /// Populated for error outcomes
    pub error: Option<String>,
}

impl TranslationResult {
    fn outcome(text: &str, source: &str, target: &str, backend: &str, confidence: f64) -> Self {
        Self {
            text: text.to_string(),
            source_lang: source.to_string(),
            target_lang: target.to_string(),
            backend_used: backend.to_string(),
            confidence,
            error: None,
        }
    }

    /// Whether `text` holds a translation (live or cached)
    pub fn is_translated(&self) -> bool {
        self.error.is_none()
            && !matches!(
                self.backend_used.as_str(),
                BACKEND_NONE | BACKEND_PASSTHROUGH | BACKEND_FAILED
            )
    }

    /// Whether every backend failed
    pub fn is_failed(&self) -> bool {
        self.backend_used == BACKEND_FAILED
    }
}

/// Running counters over every `translate` call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranslationStats {
    pub requests: usize,
    pub translated: usize,
    pub cached: usize,
    pub passthrough: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Results per `backend_used` value
    pub backend_usage: BTreeMap<String, usize>,
    confidence_sum: f64,
    confidence_samples: usize,
    pub confidence_min: Option<f64>,
    pub confidence_max: Option<f64>,
}

impl TranslationStats {
    fn record(&mut self, result: &TranslationResult) {
        self.requests += 1;
        *self.backend_usage.entry(result.backend_used.clone()).or_insert(0) += 1;

        match result.backend_used.as_str() {
            BACKEND_NONE => self.skipped += 1,
            BACKEND_PASSTHROUGH => self.passthrough += 1,
            BACKEND_FAILED => self.failed += 1,
            BACKEND_CACHE => self.cached += 1,
            _ => self.translated += 1,
        }

        if result.is_translated() {
            self.confidence_sum += result.confidence;
            self.confidence_samples += 1;
            self.confidence_min = Some(self.confidence_min.map_or(result.confidence, |m| m.min(result.confidence)));
            self.confidence_max = Some(self.confidence_max.map_or(result.confidence, |m| m.max(result.confidence)));
        }
    }

    /// Mean confidence over translated results
    pub fn average_confidence(&self) -> Option<f64> {
        if self.confidence_samples == 0 {
            None
        } else {
            Some(self.confidence_sum / self.confidence_samples as f64)
        }
    }

    /// Share of attempted translations that produced text
    pub fn success_rate(&self) -> f64 {
        let succeeded = self.translated + self.cached;
        let attempted = succeeded + self.failed;
        if attempted == 0 {
            0.0
        } else {
            succeeded as f64 / attempted as f64
        }
    }
}

/// Detects languages and translates through cache and backends
pub struct TranslationOrchestrator {
    backends: Vec<Arc<dyn TranslationBackend>>,
    cache: Arc<TranslationCache>,
    detector: Box<dyn LanguageDetector>,
    stats: Mutex<TranslationStats>,
}

impl TranslationOrchestrator {
    /// Create an orchestrator over backends in priority order
    pub fn new(
        backends: Vec<Arc<dyn TranslationBackend>>,
        cache: Arc<TranslationCache>,
        detector: Box<dyn LanguageDetector>,
    ) -> Self {
        Self {
            backends,
            cache,
            detector,
            stats: Mutex::new(TranslationStats::default()),
        }
    }

    /// Orchestrator with the configured backends and a whatlang detector
    pub fn from_config(config: &Config, cache: Arc<TranslationCache>) -> Self {
        let backends = providers::build_backends(&config.translation);
        info!(
            "Translation backends: {}",
            backends.iter().map(|b| b.name().to_string()).collect::<Vec<_>>().join(" -> ")
        );
        Self::new(backends, cache, Box::new(WhatlangDetector::new(&config.languages)))
    }

    /// Shared cache handle
    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    /// Snapshot of the running statistics
    pub fn stats(&self) -> TranslationStats {
        self.stats.lock().clone()
    }

    /// Detect the language of `text`
    ///
    /// Returns `unknown` for texts under [`MIN_DETECTION_CHARS`] characters
    /// or when the detector cannot decide.
    pub fn detect_language(&self, text: &str) -> String {
        let trimmed = text.trim();
        if trimmed.chars().count() < MIN_DETECTION_CHARS {
            return UNKNOWN_LANGUAGE.to_string();
        }

        match self.detector.detect(trimmed) {
            Some(detection) => {
                debug!("Detected '{}' (confidence {:.2})", detection.language, detection.confidence);
                detection.language
            }
            None => UNKNOWN_LANGUAGE.to_string(),
        }
    }

    /// Translate `text` into `target_lang`
    ///
    /// `source_lang` may be `auto` (or anything unrecognizable) to request
    /// detection.
    pub async fn translate(&self, text: &str, target_lang: &str, source_lang: &str) -> TranslationResult {
        let result = self.translate_inner(text, target_lang, source_lang).await;
        self.stats.lock().record(&result);
        result
    }

    async fn translate_inner(&self, text: &str, target_lang: &str, source_lang: &str) -> TranslationResult {
        let target = language_utils::normalize_language_code(target_lang)
            .unwrap_or_else(|_| target_lang.trim().to_lowercase());

        if text.trim().is_empty() {
            return TranslationResult::outcome(text, source_lang, &target, BACKEND_NONE, 0.0);
        }

        let source = match resolve_source(source_lang) {
            Some(source) => source,
            None => {
                let detected = self.detect_language(text);
                if detected == UNKNOWN_LANGUAGE {
                    return TranslationResult {
                        error: Some("Could not detect language".to_string()),
                        ..TranslationResult::outcome(text, UNKNOWN_LANGUAGE, &target, BACKEND_NONE, 0.0)
                    };
                }
                detected
            }
        };

        if source == target {
            return TranslationResult::outcome(text, &source, &target, BACKEND_PASSTHROUGH, 1.0);
        }

        if let Some(cached) = self.cache.get(text, &source, &target) {
            return TranslationResult::outcome(&cached, &source, &target, BACKEND_CACHE, 1.0);
        }

        let mut failures = Vec::new();
        for backend in &self.backends {
            match backend.translate(text, &source, &target).await {
                Ok(translation) if !translation.text.trim().is_empty() => {
                    let confidence = translation
                        .confidence
                        .unwrap_or_else(|| backend.default_confidence())
                        .clamp(0.0, 1.0);

                    if let Err(e) = self.cache.insert(text, &source, &target, &translation.text, backend.name()) {
                        warn!("Failed to write translation to cache: {}", e);
                    }

                    debug!("Translated {} -> {} with {}", source, target, backend.name());
                    return TranslationResult::outcome(&translation.text, &source, &target, backend.name(), confidence);
                }
                Ok(_) => {
                    warn!("Backend {} returned an empty translation", backend.name());
                    failures.push(format!("{}: empty response", backend.name()));
                }
                Err(e) => {
                    warn!("Backend {} failed: {}", backend.name(), e);
                    failures.push(format!("{}: {}", backend.name(), e));
                }
            }
        }

        TranslationResult {
            error: Some(if failures.is_empty() {
                "All translation backends failed (none configured)".to_string()
            } else {
                format!("All translation backends failed ({})", failures.join("; "))
            }),
            ..TranslationResult::outcome(text, &source, &target, BACKEND_FAILED, 0.0)
        }
    }

    /// Translate a keyword list into each target language
    ///
    /// Keywords that cannot be translated are kept verbatim, which is the
    /// right call for acronyms and brand names. Order is preserved and
    /// duplicates removed.
    pub async fn translate_keywords(
        &self,
        keywords: &[String],
        source_lang: &str,
        targets: &[String],
    ) -> BTreeMap<String, Vec<String>> {
        let mut translated_sets = BTreeMap::new();

        for target in targets {
            if language_utils::language_codes_match(target, source_lang) {
                continue;
            }

            let mut translated: Vec<String> = Vec::with_capacity(keywords.len());
            for keyword in keywords {
                let result = self.translate(keyword, target, source_lang).await;
                let term = if result.is_translated() { result.text.trim().to_string() } else { keyword.clone() };
                if !translated.contains(&term) {
                    translated.push(term);
                }
            }

            info!("Translated {} keywords into '{}'", translated.len(), target);
            translated_sets.insert(target.clone(), translated);
        }

        translated_sets
    }
}

fn resolve_source(source_lang: &str) -> Option<String> {
    if source_lang.trim().eq_ignore_ascii_case(AUTO_LANGUAGE) {
        return None;
    }
    language_utils::resolve_language_hint(source_lang)
}
