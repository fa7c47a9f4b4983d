//! Merge keyword rows from several sources into one record per phrase.
//!
//! Per normalized phrase, in order:
//! 1. any `branded` occurrence makes every occurrence branded;
//! 2. otherwise more than one distinct category forces every occurrence to
//!    `irrelevant`, noting the category it overrode;
//! 3. the occurrence with the highest search volume is kept (first wins ties).
//!
//! The result is sorted by search volume, highest first.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::constants::resolver::{BRANDED_ELSEWHERE_REASON, CONFLICT_REASON_PREFIX};
use crate::data::{BrandStatus, Category, KeywordRecord};
use crate::types::NormalizedPhrase;

/// Resolve category conflicts and collapse duplicates.
///
/// Deterministic for a given input order.
pub fn resolve(entries: Vec<KeywordRecord>) -> Vec<KeywordRecord> {
    let total = entries.len();
    let mut by_phrase: IndexMap<NormalizedPhrase, Vec<KeywordRecord>> = IndexMap::new();
    for entry in entries {
        by_phrase
            .entry(entry.normalized_phrase.clone())
            .or_default()
            .push(entry);
    }

    let mut branded = 0;
    let mut conflicts = 0;
    let mut resolved: Vec<KeywordRecord> = Vec::with_capacity(by_phrase.len());
    for (phrase, mut group) in by_phrase {
        if group.iter().any(|entry| entry.category == Category::Branded) {
            force_branded(&mut group);
            branded += 1;
        } else if has_conflict(&group) {
            debug!(keyword = %phrase, occurrences = group.len(), "conflicting categories; forcing irrelevant");
            force_irrelevant(&mut group);
            conflicts += 1;
        }
        if let Some(kept) = highest_volume(group) {
            resolved.push(kept);
        }
    }
    resolved.sort_by(|a, b| b.search_volume.cmp(&a.search_volume));

    info!(
        entries = total,
        keywords = resolved.len(),
        duplicates_removed = total - resolved.len(),
        branded,
        conflicts,
        "category resolution complete"
    );
    resolved
}

fn has_conflict(group: &[KeywordRecord]) -> bool {
    group
        .split_first()
        .is_some_and(|(first, rest)| rest.iter().any(|entry| entry.category != first.category))
}

fn force_branded(group: &mut [KeywordRecord]) {
    for entry in group.iter_mut() {
        if entry.category != Category::Branded {
            entry.set_category(Category::Branded, BRANDED_ELSEWHERE_REASON);
        }
    }
}

fn force_irrelevant(group: &mut [KeywordRecord]) {
    for entry in group.iter_mut() {
        let original = entry.category;
        entry.set_category(
            Category::Irrelevant,
            format!("{CONFLICT_REASON_PREFIX}: overrode {original}"),
        );
    }
}

/// Highest search volume wins; the earliest occurrence wins ties.
fn highest_volume(group: Vec<KeywordRecord>) -> Option<KeywordRecord> {
    group.into_iter().reduce(|best, entry| {
        if entry.search_volume > best.search_volume {
            entry
        } else {
            best
        }
    })
}

/// Keep records scoring at least `min_score`, plus every record with branded status.
pub fn retain_exportable(records: &mut Vec<KeywordRecord>, min_score: u8) {
    let before = records.len();
    records.retain(|record| {
        record.relevance_score >= min_score || record.brand_status == BrandStatus::Branded
    });
    debug!(
        kept = records.len(),
        dropped = before - records.len(),
        min_score,
        "export filter applied"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::KeywordRow;

    fn entry(phrase: &str, volume: u64, category: Category) -> KeywordRecord {
        KeywordRecord::new(phrase, volume, category).with_reasoning("source")
    }

    #[test]
    fn branded_occurrence_taints_all_duplicates() {
        let resolved = resolve(vec![
            entry("x", 500, Category::Relevant),
            entry("X ", 10, Category::Branded),
        ]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].category, Category::Branded);
        assert_eq!(resolved[0].brand_status, BrandStatus::Branded);
        assert_eq!(resolved[0].search_volume, 500);
        assert_eq!(resolved[0].reasoning, BRANDED_ELSEWHERE_REASON);
        assert_eq!(resolved[0].relevance_score, 0);
    }

    #[test]
    fn conflicting_categories_resolve_to_irrelevant() {
        let resolved = resolve(vec![
            entry("y", 10, Category::Relevant),
            entry("y", 40, Category::Outlier),
        ]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].category, Category::Irrelevant);
        assert_eq!(
            resolved[0].reasoning,
            "conflicting categories across sources: overrode outlier"
        );
    }

    #[test]
    fn agreeing_duplicates_keep_category_and_highest_volume() {
        let resolved = resolve(vec![
            entry("z", 10, Category::Relevant).with_reasoning("first"),
            entry("z", 30, Category::Relevant).with_reasoning("second"),
            entry("z", 30, Category::Relevant).with_reasoning("third"),
        ]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].category, Category::Relevant);
        assert_eq!(resolved[0].reasoning, "second");
    }

    #[test]
    fn output_is_sorted_by_volume_descending() {
        let resolved = resolve(vec![
            entry("low", 1, Category::Relevant),
            entry("high", 90, Category::Outlier),
            entry("mid", 50, Category::Irrelevant),
            entry("mid-tie", 50, Category::Relevant),
        ]);
        let phrases: Vec<&str> = resolved.iter().map(|r| r.phrase.as_str()).collect();
        assert_eq!(phrases, vec!["high", "mid", "mid-tie", "low"]);
    }

    #[test]
    fn empty_input_resolves_to_empty() {
        assert!(resolve(Vec::new()).is_empty());
    }

    #[test]
    fn export_filter_keeps_branded_and_high_scores() {
        let mut records = vec![
            entry("a", 1, Category::Relevant),
            entry("b", 1, Category::Irrelevant),
            entry("c", 1, Category::Branded),
            entry("d", 1, Category::CompetitorRelevant),
            entry("e", 1, Category::Outlier),
        ];
        retain_exportable(&mut records, 5);
        let phrases: Vec<&str> = records.iter().map(|r| r.phrase.as_str()).collect();
        assert_eq!(phrases, vec!["a", "c", "d"]);
    }

    #[test]
    fn export_filter_keeps_branded_status_with_low_category() {
        let row: KeywordRow = serde_json::from_str(
            r#"{"phrase": "Acme Mango", "search_volume": 40, "category": "irrelevant", "brand_status": "branded"}"#,
        )
        .unwrap();
        let mut records = vec![
            KeywordRecord::from_row(row),
            entry("plain mango", 40, Category::Irrelevant),
        ];
        retain_exportable(&mut records, 5);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].phrase, "Acme Mango");
        assert_eq!(records[0].category, Category::Irrelevant);
    }
}
