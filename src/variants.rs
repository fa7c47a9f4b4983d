//! Near-duplicate keyword detection.
//!
//! Two keywords are variants when they reduce to the same key: leading and
//! trailing pronouns/articles removed, then the last remaining token
//! singularized. Word order is significant, so "strawberry freeze dried" and
//! "freeze dried strawberry" stay apart.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::config::VariantConfig;
use crate::data::KeywordRecord;
use crate::normalizer::{is_pronoun_or_article, singularize, tokenize};
use crate::types::VariantKey;
use crate::utils::normalize_phrase;

/// Relationship between two keywords.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VariantType {
    Identical,
    PronounArticle,
    SingularPlural,
    NotVariant,
}

/// Keywords sharing one variant key plus the member chosen to represent them.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct VariantGroup {
    pub normalized_key: VariantKey,
    /// Indices into the detector input, in input order.
    pub members: Vec<usize>,
    /// Index of the representative; always one of `members`.
    pub representative: usize,
    pub total_search_volume: u64,
}

#[derive(Clone, Debug)]
pub struct VariantDetector {
    near_tie_ratio: f64,
}

impl Default for VariantDetector {
    fn default() -> Self {
        Self::new(&VariantConfig::default())
    }
}

impl VariantDetector {
    pub fn new(config: &VariantConfig) -> Self {
        Self {
            near_tie_ratio: config.near_tie_ratio,
        }
    }

    /// Partition `keywords` into variant groups.
    ///
    /// Groups are ordered by total search volume descending; equal totals keep
    /// the order in which their first member appeared.
    pub fn detect_variants(&self, keywords: &[KeywordRecord]) -> Vec<VariantGroup> {
        let mut by_key: IndexMap<VariantKey, Vec<usize>> = IndexMap::new();
        for (idx, record) in keywords.iter().enumerate() {
            by_key
                .entry(variant_key(&record.phrase))
                .or_default()
                .push(idx);
        }

        let mut groups: Vec<VariantGroup> = by_key
            .into_iter()
            .map(|(normalized_key, members)| {
                let representative = self.select_representative(keywords, &members);
                let total_search_volume = members
                    .iter()
                    .map(|idx| keywords[*idx].search_volume)
                    .sum();
                VariantGroup {
                    normalized_key,
                    members,
                    representative,
                    total_search_volume,
                }
            })
            .collect();
        groups.sort_by(|a, b| b.total_search_volume.cmp(&a.total_search_volume));

        info!(
            keywords = keywords.len(),
            groups = groups.len(),
            merged = keywords.len() - groups.len(),
            "variant detection complete"
        );
        groups
    }

    /// `true` when both phrases reduce to the same variant key.
    pub fn is_variant(&self, a: &str, b: &str) -> bool {
        variant_key(a) == variant_key(b)
    }

    /// Classify how two phrases relate.
    pub fn variant_type(&self, a: &str, b: &str) -> VariantType {
        if normalize_phrase(a) == normalize_phrase(b) {
            return VariantType::Identical;
        }
        if !self.is_variant(a, b) {
            return VariantType::NotVariant;
        }
        if content_words(a) == content_words(b) {
            VariantType::PronounArticle
        } else {
            VariantType::SingularPlural
        }
    }

    /// Highest volume wins unless near-tied members include one without a
    /// leading pronoun/article, in which case the first such member wins.
    fn select_representative(&self, keywords: &[KeywordRecord], members: &[usize]) -> usize {
        let mut ranked = members.to_vec();
        // Stable: equal volumes keep input order.
        ranked.sort_by(|a, b| keywords[*b].search_volume.cmp(&keywords[*a].search_volume));
        let top = ranked[0];
        let floor = keywords[top].search_volume as f64 * self.near_tie_ratio;
        let near_tied: Vec<usize> = ranked
            .iter()
            .copied()
            .take_while(|idx| keywords[*idx].search_volume as f64 >= floor)
            .collect();
        if near_tied.len() > 1 {
            let preferred = near_tied.iter().copied().find(|idx| {
                tokenize(&keywords[*idx].phrase)
                    .first()
                    .is_some_and(|first| !is_pronoun_or_article(first))
            });
            if let Some(idx) = preferred {
                return idx;
            }
        }
        top
    }
}

/// Variant key of a phrase: edge pronouns/articles removed, last token singularized.
///
/// A phrase made only of pronouns/articles keys to its normalized self.
pub fn variant_key(phrase: &str) -> VariantKey {
    let tokens = tokenize(phrase);
    let start = tokens
        .iter()
        .position(|token| !is_pronoun_or_article(token));
    let Some(start) = start else {
        return normalize_phrase(phrase);
    };
    let end = tokens
        .iter()
        .rposition(|token| !is_pronoun_or_article(token))
        .map_or(tokens.len(), |idx| idx + 1);
    let mut words: Vec<String> = tokens[start..end].to_vec();
    if let Some(last) = words.last_mut() {
        *last = singularize(last);
    }
    words.join(" ")
}

fn content_words(phrase: &str) -> Vec<String> {
    tokenize(phrase)
        .into_iter()
        .filter(|token| !is_pronoun_or_article(token))
        .collect()
}
