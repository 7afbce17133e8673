//! Built-in keyword sets.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

/// Clinical terms shared by most languages
const PRIMARY_KEYWORDS: &[&str] = &[
    "HIV", "PrEP", "ARVs", "syphilis", "doxy", "PEP", "chlamydia", "gonorrhoea", "gonorrhea",
];

/// Colloquial and brand-name terms seen in English threads
const COLLOQUIAL_TERMS: &[&str] = &[
    "the clap", "burning", "discharge", "Truvada", "Descovy", "undetectable", "viral load", "CD4",
];

/// Phrases marking posts written by or for recent newcomers
const NEWCOMER_PHRASES: &[&str] = &[
    "new to Canada",
    "just moved here",
    "recent immigrant",
    "don't know the system",
    "how does healthcare work",
    "no health card",
    "walk-in clinic",
    "without OHIP",
];

/// Default keyword sets keyed by ISO 639-1 code
pub static DEFAULT_KEYWORD_SETS: Lazy<BTreeMap<String, Vec<String>>> = Lazy::new(|| {
    let mut sets = BTreeMap::new();

    sets.insert(
        "en".to_string(),
        PRIMARY_KEYWORDS.iter().chain(COLLOQUIAL_TERMS).map(|s| s.to_string()).collect(),
    );
    sets.insert("es".to_string(), owned(&["VIH", "PrEP", "sífilis", "clamidia", "gonorrea", "condón", "salud sexual"]));
    sets.insert("fr".to_string(), owned(&["VIH", "PrEP", "syphilis", "chlamydia", "gonorrhée", "santé sexuelle"]));
    sets.insert("tl".to_string(), owned(&["HIV", "PrEP", "sipilis", "STD", "kalusugang sekswal", "proteksyon"]));
    sets.insert("zh".to_string(), owned(&["艾滋病", "HIV", "梅毒", "淋病", "衣原体", "性健康", "安全套"]));
    sets.insert("pa".to_string(), owned(&["HIV", "ਐਚਆਈਵੀ", "ਸਿਫਿਲਿਸ", "ਸੈਕਸੁਅਲ ਸਿਹਤ"]));

    sets
});

/// Default secondary (newcomer) phrases
pub static DEFAULT_SECONDARY_PHRASES: Lazy<Vec<String>> = Lazy::new(|| owned(NEWCOMER_PHRASES));

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|s| s.to_string()).collect()
}
