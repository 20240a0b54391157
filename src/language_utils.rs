use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Configuration accepts ISO 639-1, ISO 639-2 (T or B) codes or English
/// language names; collaborators want the short ISO 639-1 form.

// ISO 639-2/B codes that differ from their 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"), ("ger", "deu"), ("dut", "nld"), ("gre", "ell"),
    ("chi", "zho"), ("cze", "ces"), ("ice", "isl"), ("alb", "sqi"),
    ("arm", "hye"), ("baq", "eus"), ("bur", "mya"), ("per", "fas"),
    ("geo", "kat"), ("may", "msa"), ("mac", "mkd"), ("rum", "ron"),
    ("slo", "slk"), ("wel", "cym"),
];

fn lookup(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        0 => None,
        2 => Language::from_639_1(&normalized),
        3 => {
            let terminological = BIBLIOGRAPHIC_CODES.iter()
                .find(|(b, _)| *b == normalized)
                .map_or(normalized.as_str(), |(_, t)| t);
            Language::from_639_3(terminological)
        }
        _ => {
            // English names such as "english" or "Japanese"
            let mut chars = normalized.chars();
            let capitalized: String = chars.next()
                .map(|first| first.to_uppercase().chain(chars).collect())
                .unwrap_or_default();
            Language::from_name(&capitalized)
        }
    }
}

/// Normalize a language code or name to ISO 639-1 (2-letter) format
pub fn normalize_to_part1(code: &str) -> Result<String> {
    let lang = lookup(code)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    lang.to_639_1()
        .map(|c| c.to_string())
        .ok_or_else(|| anyhow!("Language has no two-letter code: {}", code))
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = lookup(code)
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    Ok(lang.to_name().to_string())
}
