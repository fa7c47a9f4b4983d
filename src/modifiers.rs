//! Competitor modifier categorization.
//!
//! An irrelevant keyword such as "mango slices for dogs" differs from our
//! relevant keywords by its modifiers ("dogs"). When competitor titles carry
//! one of those modifiers the market demands the variation even though we do
//! not sell it, and the keyword is promoted to `competitor_relevant`.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::constants::modifiers::{COMPETITOR_RELEVANT_REASON, MODIFIER_STOP_WORDS};
use crate::data::{Category, KeywordRecord};
use crate::normalizer::clean_token;
use crate::types::{CompetitorTitle, Modifier, Phrase};

/// Words of `keyword` that are neither modifier stop-words nor present in `relevant_keywords`.
///
/// Input order is kept; repeated words are reported once per occurrence.
pub fn extract_modifiers<S: AsRef<str>>(keyword: &str, relevant_keywords: &[S]) -> Vec<Modifier> {
    let relevant_words: HashSet<String> = relevant_keywords
        .iter()
        .flat_map(|phrase| phrase.as_ref().split_whitespace().map(clean_token))
        .filter(|word| !word.is_empty())
        .collect();
    keyword
        .split_whitespace()
        .map(clean_token)
        .filter(|word| {
            !word.is_empty()
                && !MODIFIER_STOP_WORDS.contains(&word.as_str())
                && !relevant_words.contains(word)
        })
        .collect()
}

/// Titles containing `modifier` as a whole word, case-insensitively.
///
/// "table" never matches "portable".
pub fn find_modifier_in_titles<'a>(
    modifier: &str,
    titles: &'a [CompetitorTitle],
) -> Vec<&'a CompetitorTitle> {
    let needle = modifier.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    titles
        .iter()
        .filter(|title| contains_whole_word(&title.to_lowercase(), &needle))
        .collect()
}

fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    let is_word_char = |ch: char| ch.is_alphanumeric() || ch == '_';
    haystack.match_indices(needle).any(|(start, matched)| {
        let end = start + matched.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

/// Decide, per irrelevant keyword, whether competitor titles show demand for its modifiers.
///
/// Keywords without modifiers, or whose modifiers appear in no title, stay
/// `irrelevant`; the rest become `competitor_relevant`.
pub fn categorize_irrelevant<S: AsRef<str>>(
    irrelevant_keywords: &[S],
    relevant_keywords: &[S],
    competitor_titles: &[CompetitorTitle],
) -> IndexMap<Phrase, Category> {
    let mut categories = IndexMap::with_capacity(irrelevant_keywords.len());
    for keyword in irrelevant_keywords {
        let keyword = keyword.as_ref();
        let modifiers = extract_modifiers(keyword, relevant_keywords);
        let found = modifiers.iter().find_map(|modifier| {
            let matches = find_modifier_in_titles(modifier, competitor_titles);
            (!matches.is_empty()).then_some((modifier, matches.len()))
        });
        let category = match found {
            Some((modifier, titles)) => {
                debug!(keyword, modifier = %modifier, titles, "modifier found in competitor titles");
                Category::CompetitorRelevant
            }
            None => {
                debug!(keyword, modifiers = modifiers.len(), "no modifier demand found");
                Category::Irrelevant
            }
        };
        categories.insert(keyword.to_string(), category);
    }
    categories
}

/// Phrases of the `n` highest-volume on-target records (relevant or design_specific).
pub fn top_relevant_keywords(records: &[KeywordRecord], n: usize) -> Vec<Phrase> {
    let mut on_target: Vec<&KeywordRecord> = records
        .iter()
        .filter(|record| record.category.is_on_target())
        .collect();
    on_target.sort_by(|a, b| b.search_volume.cmp(&a.search_volume));
    on_target
        .into_iter()
        .take(n)
        .map(|record| record.phrase.clone())
        .collect()
}

/// Promote records marked `competitor_relevant` in `categories`; returns how many changed.
///
/// Lookups use the record phrase as supplied, then its normalized form.
/// `design_specific` records are never touched.
pub fn apply_competitor_categories(
    records: &mut [KeywordRecord],
    categories: &IndexMap<Phrase, Category>,
) -> usize {
    let mut promoted = 0;
    for record in records.iter_mut() {
        let category = categories
            .get(&record.phrase)
            .or_else(|| categories.get(&record.normalized_phrase));
        if category != Some(&Category::CompetitorRelevant)
            || matches!(
                record.category,
                Category::DesignSpecific | Category::CompetitorRelevant
            )
        {
            continue;
        }
        record.set_category(Category::CompetitorRelevant, COMPETITOR_RELEVANT_REASON);
        promoted += 1;
    }
    info!(promoted, "applied competitor modifier categories");
    promoted
}
