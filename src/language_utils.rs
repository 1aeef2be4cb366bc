use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for target language codes
///
/// Codes are ISO 639-1 (2-letter) or ISO 639-3 (3-letter), optionally with a
/// region subtag (`zh-CN`, `pt_BR`) which is ignored for lookups.
/// ISO 639-2/B codes that differ from their 639-3 form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("per", "fas"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Native names for the languages the prompt names explicitly
const NATIVE_NAMES: &[(&str, &str)] = &[
    ("zh", "中文"),
    ("en", "English"),
    ("ja", "日本語"),
    ("ko", "한국어"),
];

/// Primary language subtag, lowercased
fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn lookup(code: &str) -> Option<Language> {
    let primary = primary_subtag(code);
    match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => {
            let part3 = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(bibliographic, _)| *bibliographic == primary)
                .map_or(primary.as_str(), |(_, terminology)| terminology);
            Language::from_639_3(part3)
        }
        _ => None,
    }
}

/// Validate that a code names a known language
pub fn validate_language_code(code: &str) -> Result<()> {
    lookup(code)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 when one exists, ISO 639-3 otherwise
pub fn normalize_language_code(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(lang
        .to_639_1()
        .map(str::to_string)
        .unwrap_or_else(|| lang.to_639_3().to_string()))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Name of the target language as written into the prompt.
///
/// Uses the native name for the common targets, the English name for other
/// known codes, and the code itself otherwise.
pub fn display_name(code: &str) -> String {
    let normalized = normalize_language_code(code).unwrap_or_else(|_| primary_subtag(code));

    if let Some((_, native)) = NATIVE_NAMES.iter().find(|(c, _)| *c == normalized) {
        return (*native).to_string();
    }

    match lookup(code) {
        Some(lang) => lang.to_name().to_string(),
        None => code.trim().to_string(),
    }
}
