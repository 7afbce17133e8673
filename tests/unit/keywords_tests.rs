/*!
 * Tests for keyword matching
 */

use std::collections::BTreeMap;

use polyharvest::keywords::KeywordMatcher;

use crate::common;

#[test]
fn test_containsTopicKeywords_withCjkText_shouldMatchRawText() {
    let matcher = KeywordMatcher::with_defaults("en");

    assert!(matcher.contains_topic_keywords("艾滋病预防", "zh"));
    assert!(!matcher.contains_topic_keywords("艾滋病预防", "en"));
}

#[test]
fn test_containsTopicKeywords_withLowercaseText_shouldMatchUppercaseKeyword() {
    let matcher = KeywordMatcher::with_defaults("en");

    assert!(matcher.contains_topic_keywords("i have hiv", "en"));
    assert!(matcher.contains_topic_keywords("Where do I get prep?", "unknown"));
}

#[test]
fn test_containsTopicKeywords_withKeywordInsideWord_shouldMatchAsSubstring() {
    let matcher = KeywordMatcher::with_defaults("en");
    assert!(matcher.contains_topic_keywords("HIVOID", "en"));
}

#[test]
fn test_containsTopicKeywords_withEmptyOrUnrelatedText_shouldNotMatch() {
    let matcher = KeywordMatcher::with_defaults("en");

    assert!(!matcher.contains_topic_keywords("", "en"));
    assert!(!matcher.contains_topic_keywords("   ", "es"));
    assert!(!matcher.contains_topic_keywords("Best brunch spots downtown?", "en"));
}

#[test]
fn test_containsTopicKeywords_withLanguageNameHint_shouldUseThatSet() {
    let matcher = KeywordMatcher::with_defaults("en");

    assert!(matcher.contains_topic_keywords("ਮੈਨੂੰ ਐਚਆਈਵੀ ਬਾਰੇ ਜਾਣਕਾਰੀ ਚਾਹੀਦੀ ਹੈ", "Punjabi"));
    assert!(matcher.contains_topic_keywords("información sobre la clamidia", "Español"));
    assert!(!matcher.contains_topic_keywords("información sobre la clamidia", "klingon"));
}

#[test]
fn test_matchesRecord_withMatchOnlyInTranslation_shouldFlagTranslated() {
    let matcher = KeywordMatcher::with_defaults("en");

    let outcome = matcher.matches_record(
        "Necesito ayuda con mi tratamiento",
        Some("I need help with my PrEP treatment"),
        "es",
    );

    assert!(!outcome.original);
    assert!(outcome.translated);
    assert!(outcome.matched());
}

#[test]
fn test_matchesRecord_withoutTranslation_shouldOnlyCheckOriginal() {
    let matcher = KeywordMatcher::with_defaults("en");

    let outcome = matcher.matches_record("Necesito información sobre VIH", None, "es");

    assert!(outcome.original);
    assert!(!outcome.translated);
}

#[test]
fn test_isSecondaryRelated_withNewcomerPhrase_shouldMatch() {
    let matcher = KeywordMatcher::with_defaults("en");

    assert!(matcher.is_secondary_related("I just moved here and don't know the system"));
    assert!(!matcher.is_secondary_related(""));
    assert!(!matcher.is_secondary_related("Looking for a dentist"));
}

#[test]
fn test_new_withCustomSets_shouldUseOnlyThem() {
    let mut sets = BTreeMap::new();
    sets.insert("en".to_string(), vec!["clinic".to_string()]);
    sets.insert("Spanish".to_string(), vec!["clínica".to_string()]);

    let matcher = KeywordMatcher::new("EN", &sets, &["newcomer"]);

    assert_eq!(matcher.default_language(), "en");
    assert_eq!(matcher.languages(), vec!["en".to_string(), "es".to_string()]);
    assert!(matcher.contains_topic_keywords("Una CLÍNICA cerca", "es"));
    assert!(!matcher.contains_topic_keywords("HIV testing", "en"));
    assert!(matcher.is_secondary_related("A NEWCOMER question"));
}

#[test]
fn test_loadFile_shouldMergeKeywordSets() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("keywords.json");
    std::fs::write(&path, r#"{"tl": ["klinika"], "ko": ["에이즈"]}"#).unwrap();

    let mut matcher = KeywordMatcher::with_defaults("en");
    matcher.load_file(&path).unwrap();

    assert!(matcher.contains_topic_keywords("Saan may libreng klinika?", "tl"));
    assert!(matcher.contains_topic_keywords("에이즈 검사", "ko"));
    assert!(matcher.keyword_set("tl").unwrap().terms().contains(&"HIV".to_string()));
}

#[test]
fn test_loadFile_withMissingFile_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let mut matcher = KeywordMatcher::with_defaults("en");

    assert!(matcher.load_file(dir.path().join("missing.json")).is_err());
}
