//! Token normalization shared by clustering and variant detection.
//!
//! Everything here is a pure function over the input phrase: lowercase,
//! whitespace split, per-token punctuation stripping, and lookups against the
//! fixed stop-word and pronoun/article lists.

use crate::constants::normalizer::{PRONOUNS_ARTICLES, STOP_WORDS};

/// Split a phrase into lowercase tokens with punctuation stripped.
///
/// Word characters and `-` survive; tokens left empty are dropped.
pub fn tokenize(phrase: &str) -> Vec<String> {
    phrase
        .split_whitespace()
        .map(clean_token)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Content tokens of a phrase: tokenized, stop-words removed, each singularized.
pub fn normalize(phrase: &str) -> Vec<String> {
    tokenize(phrase)
        .into_iter()
        .filter(|token| !is_stop_word(token))
        .map(|token| singularize(&token))
        .collect()
}

/// Lowercase a raw token and strip everything except word characters and `-`.
pub fn clean_token(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter(|ch| ch.is_alphanumeric() || *ch == '_' || *ch == '-')
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

pub fn is_pronoun_or_article(token: &str) -> bool {
    PRONOUNS_ARTICLES.contains(&token)
}

/// Naive English singularization.
///
/// Rules apply in order:
/// - `...ies` (len > 4) becomes `...y`
/// - `...ses`, `...ches`, `...shes`, `...xes` drop the trailing `es`
/// - any other `...es` (len > 3) drops the trailing `s`
/// - a trailing `s` (len > 2, not `ss` or `us`) is dropped
pub fn singularize(word: &str) -> String {
    let len = word.chars().count();
    if word.ends_with("ies") && len > 4 {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.ends_with("es") && len > 3 {
        if ["ses", "ches", "shes", "xes"]
            .iter()
            .any(|suffix| word.ends_with(suffix))
        {
            return word[..word.len() - 2].to_string();
        }
        return word[..word.len() - 1].to_string();
    }
    if word.ends_with('s') && len > 2 && !word.ends_with("ss") && !word.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}
