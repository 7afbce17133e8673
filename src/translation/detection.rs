/*!
 * Language detection.
 *
 * Detection is a seam: the orchestrator holds a `dyn LanguageDetector` so
 * tests and alternative models can be swapped in. The default
 * implementation uses whatlang's trigram model restricted to the languages
 * the pipeline is configured for, which keeps short posts from being
 * classified as some unrelated language with a similar alphabet.
 */

use log::warn;
use whatlang::Lang;

use crate::language_utils;

/// A detected language
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// ISO 639-1 code
    pub language: String,
    /// Detector confidence in `[0, 1]`
    pub confidence: f64,
}

/// Anything that can guess the language of a text
pub trait LanguageDetector: Send + Sync {
    /// Detect the language of `text`, or `None` when no guess can be made
    fn detect(&self, text: &str) -> Option<Detection>;
}

/// whatlang-based detector
pub struct WhatlangDetector {
    detector: whatlang::Detector,
}

impl WhatlangDetector {
    /// Detector restricted to the given ISO 639-1 codes
    ///
    /// Codes whatlang does not know are skipped with a warning; an empty
    /// resulting list falls back to the unrestricted model.
    pub fn new(languages: &[String]) -> Self {
        let allowlist: Vec<Lang> = languages
            .iter()
            .filter_map(|code| {
                let lang = whatlang_code(code).and_then(|c| Lang::from_code(c.as_str()));
                if lang.is_none() {
                    warn!("Language '{}' is not supported by the detector, ignoring", code);
                }
                lang
            })
            .collect();

        let detector = if allowlist.is_empty() {
            whatlang::Detector::new()
        } else {
            whatlang::Detector::with_allowlist(allowlist)
        };

        Self { detector }
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<Detection> {
        let info = self.detector.detect(text)?;
        let language = language_utils::normalize_language_code(info.lang().code()).ok()?;

        Some(Detection {
            language,
            confidence: info.confidence(),
        })
    }
}

/// whatlang speaks ISO 639-3 and reports Mandarin rather than the macro code
fn whatlang_code(code: &str) -> Option<String> {
    let part1 = language_utils::normalize_language_code(code).ok()?;
    match part1.as_str() {
        "zh" => Some("cmn".to_string()),
        other => language_utils::to_part3(other).ok(),
    }
}
