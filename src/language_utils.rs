use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Everything the pipeline stores or compares is an ISO 639-1 code
/// (`en`, `es`, `zh`, ...). Inputs arrive in many shapes: region tags from
/// detectors (`zh-CN`), three-letter codes (`spa`, `chi`), or free-form
/// names in source metadata (`Spanish`). These helpers fold them together.

/// Sentinel for text whose language could not be determined
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Source language marker asking the orchestrator to detect the language
pub const AUTO_LANGUAGE: &str = "auto";

/// ISO 639-2/B codes that differ from their ISO 639-2/T form
fn bibliographic_to_terminologic(code: &str) -> Option<&'static str> {
    match code {
        "fre" => Some("fra"),
        "ger" => Some("deu"),
        "dut" => Some("nld"),
        "gre" => Some("ell"),
        "chi" => Some("zho"),
        "cze" => Some("ces"),
        "per" => Some("fas"),
        "may" => Some("msa"),
        "rum" => Some("ron"),
        "slo" => Some("slk"),
        _ => None,
    }
}

/// Macro-language members detectors like to report instead of the macro code
fn macrolanguage_member(code: &str) -> Option<&'static str> {
    match code {
        "cmn" | "yue" | "wuu" => Some("zh"),
        "pnb" => Some("pa"),
        "fil" => Some("tl"),
        _ => None,
    }
}

/// English (and a few native) names seen in source metadata
fn language_alias(name: &str) -> Option<&'static str> {
    match name {
        "english" => Some("en"),
        "spanish" | "español" | "espanol" => Some("es"),
        "french" | "français" | "francais" => Some("fr"),
        "tagalog" | "filipino" => Some("tl"),
        "chinese" | "mandarin" | "cantonese" | "中文" => Some("zh"),
        "punjabi" | "panjabi" | "ਪੰਜਾਬੀ" => Some("pa"),
        "portuguese" => Some("pt"),
        "german" => Some("de"),
        "arabic" => Some("ar"),
        "hindi" => Some("hi"),
        _ => None,
    }
}

/// Normalize a language code to ISO 639-1
///
/// Accepts two- and three-letter codes in any case and strips region or
/// script subtags (`zh-CN`, `pt_BR`, `zh-Hans`).
pub fn normalize_language_code(code: &str) -> Result<String> {
    let lowered = code.trim().to_lowercase();
    let primary = lowered
        .split(['-', '_'])
        .next()
        .unwrap_or_default();

    if primary.len() == 2 {
        if Language::from_639_1(primary).is_some() {
            return Ok(primary.to_string());
        }
    } else if primary.len() == 3 {
        if let Some(member) = macrolanguage_member(primary) {
            return Ok(member.to_string());
        }

        let part2t = bibliographic_to_terminologic(primary).unwrap_or(primary);
        if let Some(part1) = Language::from_639_3(part2t).and_then(|lang| lang.to_639_1()) {
            return Ok(part1.to_string());
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Resolve a loose language hint (code or name) to ISO 639-1
///
/// Returns `None` for empty hints, the `unknown`/`auto` sentinels and
/// anything that cannot be mapped.
pub fn resolve_language_hint(hint: &str) -> Option<String> {
    let lowered = hint.trim().to_lowercase();
    if lowered.is_empty() || lowered == UNKNOWN_LANGUAGE || lowered == AUTO_LANGUAGE {
        return None;
    }

    if let Some(code) = language_alias(&lowered) {
        return Some(code.to_string());
    }

    normalize_language_code(&lowered).ok()
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_language_code(code1), normalize_language_code(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Convert an ISO 639-1 code to the ISO 639-3 code used by detectors
pub fn to_part3(code: &str) -> Result<String> {
    let part1 = normalize_language_code(code)?;
    let lang = Language::from_639_1(&part1)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", part1))?;

    Ok(lang.to_639_3().to_string())
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let part1 = normalize_language_code(code)?;
    let lang = Language::from_639_1(&part1)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", part1))?;

    Ok(lang.to_name().to_string())
}
