/*!
 * Multilingual keyword matching.
 *
 * The matcher holds one keyword set per language. A text is relevant when
 * any keyword of the default-language set, or of the set selected by the
 * language hint, occurs in it.
 *
 * Comparison is script aware and decided per keyword: a keyword containing
 * cased letters (Latin, Cyrillic, ...) is compared against a lowercased copy
 * of the text, while keywords written in scripts without case (Han,
 * Gurmukhi, ...) are compared against the raw text.
 *
 * Matching is plain substring search. No word boundaries are enforced, so
 * `HIV` matches inside `HIVOID` and `PrEP` inside `prepare`; callers that
 * need whole-word precision must filter downstream.
 */

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::file_utils::FileManager;
use crate::language_utils;

pub mod defaults;

pub use defaults::{DEFAULT_KEYWORD_SETS, DEFAULT_SECONDARY_PHRASES};

/// A keyword prepared for matching
#[derive(Debug, Clone, PartialEq)]
struct Keyword {
    original: String,
    /// Lowercased form, present only for keywords with cased letters
    folded: Option<String>,
}

impl Keyword {
    fn new(term: &str) -> Self {
        let original = term.trim().to_string();
        let folded = has_case(&original).then(|| original.to_lowercase());
        Self { original, folded }
    }

    fn is_in(&self, raw: &str, folded: &str) -> bool {
        match &self.folded {
            Some(keyword) => folded.contains(keyword.as_str()),
            None => raw.contains(self.original.as_str()),
        }
    }
}

fn has_case(term: &str) -> bool {
    term.chars().any(|c| c.is_lowercase() || c.is_uppercase())
}

/// Keywords of one language
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordSet {
    keywords: Vec<Keyword>,
}

impl KeywordSet {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Self {
        let mut set = Self::default();
        set.extend(terms);
        set
    }

    /// Add terms, ignoring blanks and duplicates
    pub fn extend<S: AsRef<str>>(&mut self, terms: &[S]) {
        for term in terms {
            let keyword = Keyword::new(term.as_ref());
            if !keyword.original.is_empty() && !self.keywords.contains(&keyword) {
                self.keywords.push(keyword);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn terms(&self) -> Vec<String> {
        self.keywords.iter().map(|k| k.original.clone()).collect()
    }

    fn first_match(&self, raw: &str, folded: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|keyword| keyword.is_in(raw, folded))
            .map(|keyword| keyword.original.as_str())
    }
}

/// Where a record matched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub original: bool,
    pub translated: bool,
}

impl MatchOutcome {
    pub fn matched(&self) -> bool {
        self.original || self.translated
    }
}

/// Topic relevance tests over per-language keyword sets
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    default_language: String,
    sets: BTreeMap<String, KeywordSet>,
    secondary: KeywordSet,
}

impl KeywordMatcher {
    /// Build a matcher from raw keyword lists keyed by language
    pub fn new<S: AsRef<str>>(
        default_language: &str,
        sets: &BTreeMap<String, Vec<String>>,
        secondary_phrases: &[S],
    ) -> Self {
        let mut matcher = Self {
            default_language: normalize_key(default_language),
            sets: BTreeMap::new(),
            secondary: KeywordSet::new(secondary_phrases),
        };
        matcher.merge(sets);
        matcher
    }

    /// Matcher over the built-in keyword sets
    pub fn with_defaults(default_language: &str) -> Self {
        Self::new(default_language, &DEFAULT_KEYWORD_SETS, DEFAULT_SECONDARY_PHRASES.as_slice())
    }

    /// Add keyword sets; terms are appended to existing sets of the same language
    pub fn merge(&mut self, sets: &BTreeMap<String, Vec<String>>) {
        for (language, terms) in sets {
            self.sets
                .entry(normalize_key(language))
                .or_default()
                .extend(terms.as_slice());
        }
    }

    /// Merge the keyword sets of a JSON file (`{"es": ["VIH", ...], ...}`)
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let sets: BTreeMap<String, Vec<String>> = FileManager::read_json(path)
            .with_context(|| format!("Failed to load keyword file {:?}", path))?;
        info!("Loaded keyword sets for {} languages from {:?}", sets.len(), path);
        self.merge(&sets);
        Ok(())
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Terms of the default-language set
    pub fn default_terms(&self) -> Vec<String> {
        self.sets
            .get(&self.default_language)
            .map(KeywordSet::terms)
            .unwrap_or_default()
    }

    /// Languages with a keyword set
    pub fn languages(&self) -> Vec<String> {
        self.sets.keys().cloned().collect()
    }

    pub fn keyword_set(&self, language: &str) -> Option<&KeywordSet> {
        self.sets.get(&normalize_key(language))
    }

    /// Whether `text` contains a topic keyword
    ///
    /// The default-language set is always checked; the set selected by
    /// `language_hint` (a code or a language name) is checked as well.
    pub fn contains_topic_keywords(&self, text: &str, language_hint: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        let folded = text.to_lowercase();

        let mut candidates = vec![self.default_language.clone()];
        if let Some(hinted) = language_utils::resolve_language_hint(language_hint) {
            if hinted != self.default_language {
                candidates.push(hinted);
            }
        }

        for language in candidates {
            if let Some(keyword) = self.sets.get(&language).and_then(|set| set.first_match(text, &folded)) {
                debug!("Keyword '{}' ({}) matched", keyword, language);
                return true;
            }
        }

        false
    }

    /// Check a record's original and translated text
    ///
    /// The translated text is checked against the default-language set,
    /// which is the language translations are produced in.
    pub fn matches_record(&self, original: &str, translated: Option<&str>, language_hint: &str) -> MatchOutcome {
        MatchOutcome {
            original: self.contains_topic_keywords(original, language_hint),
            translated: translated
                .map(|text| self.contains_topic_keywords(text, &self.default_language))
                .unwrap_or(false),
        }
    }

    /// Whether `text` contains a secondary (newcomer) phrase
    pub fn is_secondary_related(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let folded = text.to_lowercase();
        self.secondary.first_match(text, &folded).is_some()
    }
}

fn normalize_key(language: &str) -> String {
    language_utils::resolve_language_hint(language)
        .unwrap_or_else(|| language.trim().to_lowercase())
}
