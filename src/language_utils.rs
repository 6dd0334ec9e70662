//! Language utilities for the language tags the backend accepts
//!
//! Tags are a primary ISO 639-1 / 639-2 code with an optional region or script
//! subtag, e.g. `en`, `zh-TW`, `pt-BR`, `zh-Hant`.

use anyhow::{Result, anyhow};
use isolang::Language;

/// A validated language tag split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTag {
    /// Primary language code, lowercase
    pub primary: String,
    /// Region (uppercase) or script (titlecase) subtag
    pub subtag: Option<String>,
}

impl LanguageTag {
    /// Parse and validate a tag
    pub fn parse(tag: &str) -> Result<Self> {
        let trimmed = tag.trim();
        let mut parts = trimmed.split(['-', '_']);
        let primary = parts.next().unwrap_or_default().to_lowercase();
        let subtag = parts.next().map(str::to_string);

        if parts.next().is_some() {
            return Err(anyhow!("Unsupported language tag: {}", tag));
        }

        if normalize_to_part2t(&primary).is_err() {
            return Err(anyhow!("Invalid language code: {}", tag));
        }

        let subtag = match subtag {
            None => None,
            Some(s) if s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(s.to_uppercase())
            }
            Some(s) if s.len() == 3 && s.chars().all(|c| c.is_ascii_digit()) => Some(s),
            Some(s) if s.len() == 4 && s.chars().all(|c| c.is_ascii_alphabetic()) => {
                let lower = s.to_lowercase();
                Some(format!("{}{}", lower[..1].to_uppercase(), &lower[1..]))
            }
            Some(s) => return Err(anyhow!("Invalid subtag '{}' in language tag: {}", s, tag)),
        };

        Ok(Self { primary, subtag })
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subtag {
            Some(subtag) => write!(f, "{}-{}", self.primary, subtag),
            None => f.write_str(&self.primary),
        }
    }
}

/// Validate a language tag and return its canonical spelling
pub fn validate_language_tag(tag: &str) -> Result<String> {
    Ok(LanguageTag::parse(tag)?.to_string())
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    // If it's a 2-letter code, convert to 3-letter
    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    }
    // If it's already a 3-letter code, ensure it's ISO 639-2/T
    else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }

        // ISO 639-2/B codes that differ from their 639-2/T form
        let part2t = match normalized_code.as_str() {
            "fre" => "fra",
            "ger" => "deu",
            "dut" => "nld",
            "gre" => "ell",
            "chi" => "zho",
            "cze" => "ces",
            "per" => "fas",
            "rum" => "ron",
            "slo" => "slk",
            _ => "",
        };
        if !part2t.is_empty() {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two language tags name the same language and variant
pub fn language_codes_match(tag1: &str, tag2: &str) -> bool {
    let (Ok(a), Ok(b)) = (LanguageTag::parse(tag1), LanguageTag::parse(tag2)) else {
        return false;
    };

    let same_language = match (normalize_to_part2t(&a.primary), normalize_to_part2t(&b.primary)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    };
    same_language && a.subtag == b.subtag
}

/// Get a readable name for a language tag
pub fn get_language_name(tag: &str) -> Result<String> {
    let parsed = LanguageTag::parse(tag)?;
    let normalized = normalize_to_part2t(&parsed.primary)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    let name = lang.to_name();
    Ok(match (normalized.as_str(), parsed.subtag.as_deref()) {
        ("zho", Some("TW" | "HK" | "MO" | "Hant")) => format!("{} (Traditional)", name),
        ("zho", Some("CN" | "SG" | "Hans")) => format!("{} (Simplified)", name),
        (_, Some(subtag)) => format!("{} ({})", name, subtag),
        (_, None) => name.to_string(),
    })
}
