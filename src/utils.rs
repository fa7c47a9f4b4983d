//! Text and number helpers shared by ingestion, clustering, and reporting.

use crate::types::NormalizedPhrase;

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_inline_whitespace<T: AsRef<str>>(text: T) -> String {
    let mut normalized = String::new();
    let mut seen_space = false;
    for ch in text.as_ref().chars() {
        if ch.is_whitespace() {
            if !seen_space {
                normalized.push(' ');
                seen_space = true;
            }
        } else {
            normalized.push(ch);
            seen_space = false;
        }
    }
    normalized.trim().to_string()
}

/// Lowercase a phrase and collapse its whitespace; the lookup key for a keyword.
pub fn normalize_phrase<T: AsRef<str>>(phrase: T) -> NormalizedPhrase {
    normalize_inline_whitespace(phrase.as_ref().to_lowercase())
}

/// Parse a search-volume cell such as `"1,234"` or `"12.7"`.
///
/// Thousands separators and surrounding whitespace are ignored, fractional
/// values are floored, and anything negative or unparseable becomes 0.
pub fn parse_search_volume(raw: &str) -> u64 {
    let cleaned: String = raw
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return 0;
    }
    if let Ok(value) = cleaned.parse::<u64>() {
        return value;
    }
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value.floor() as u64,
        _ => 0,
    }
}

/// Format an integer with `,` thousands separators.
pub fn format_with_commas(value: u64) -> String {
    let raw = value.to_string();
    let mut grouped_reversed = String::with_capacity(raw.len() + (raw.len() / 3));
    for (idx, ch) in raw.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            grouped_reversed.push(',');
        }
        grouped_reversed.push(ch);
    }
    grouped_reversed.chars().rev().collect()
}
