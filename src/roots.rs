//! Deterministic root clustering.
//!
//! Keywords are grouped under the bigram or unigram "root" they share with
//! other keywords. Claiming is greedy and runs in three phases:
//!
//! 1. Bigrams (frequency >= `min_root_frequency`, most frequent first) claim
//!    every still-unclaimed keyword whose token phrase contains the bigram.
//! 2. Unigrams do the same over what is left, matching whole tokens only.
//! 3. Whatever remains lands in a single synthetic `unclaimed` group.
//!
//! A keyword belongs to exactly one group. Frequency ties are broken by the
//! first-seen position in the input, so the caller's ordering is part of the
//! contract: identical input sequences produce identical groups.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ClusterConfig;
use crate::constants::clustering::UNCLAIMED_ROOT;
use crate::data::{Category, KeywordRecord};
use crate::normalizer::{is_stop_word, tokenize};
use crate::types::RootPhrase;

/// Kind of root that claimed a group.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RootType {
    Bigram,
    Unigram,
    Unclaimed,
}

/// A root and the keywords it claimed.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RootGroup {
    pub root: RootPhrase,
    pub root_type: RootType,
    /// Indices into the clustered input, in claim order.
    pub members: Vec<usize>,
}

/// Greedy two-phase bigram/unigram clusterer.
#[derive(Clone, Debug)]
pub struct RootClusterer {
    min_root_frequency: usize,
}

impl Default for RootClusterer {
    fn default() -> Self {
        Self::new(&ClusterConfig::default())
    }
}

/// Per-keyword view used during claiming.
struct KeywordRoots {
    phrase: String,
    tokens: Vec<String>,
    bigrams: Vec<String>,
    unigrams: Vec<String>,
}

impl KeywordRoots {
    fn from_phrase(raw: &str) -> Self {
        let tokens = tokenize(raw);
        let mut bigrams: Vec<String> = Vec::new();
        for pair in tokens.windows(2) {
            if is_stop_word(&pair[0]) && is_stop_word(&pair[1]) {
                continue;
            }
            let bigram = format!("{} {}", pair[0], pair[1]);
            if !bigrams.contains(&bigram) {
                bigrams.push(bigram);
            }
        }
        let mut unigrams: Vec<String> = Vec::new();
        for token in &tokens {
            if !is_stop_word(token) && !unigrams.contains(token) {
                unigrams.push(token.clone());
            }
        }
        Self {
            phrase: tokens.join(" "),
            tokens,
            bigrams,
            unigrams,
        }
    }
}

impl RootClusterer {
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            min_root_frequency: config.min_root_frequency.max(1),
        }
    }

    /// Cluster keyword records; member indices refer to `keywords`.
    pub fn cluster(&self, keywords: &[KeywordRecord]) -> Vec<RootGroup> {
        let phrases: Vec<&str> = keywords
            .iter()
            .map(|record| record.normalized_phrase.as_str())
            .collect();
        self.cluster_phrases(&phrases)
    }

    /// Cluster raw phrases; member indices refer to `phrases`.
    pub fn cluster_phrases<S: AsRef<str>>(&self, phrases: &[S]) -> Vec<RootGroup> {
        let keywords: Vec<KeywordRoots> = phrases
            .iter()
            .map(|phrase| KeywordRoots::from_phrase(phrase.as_ref()))
            .collect();

        let bigram_counts = count_roots(keywords.iter().map(|kw| kw.bigrams.as_slice()));
        let unigram_counts = count_roots(keywords.iter().map(|kw| kw.unigrams.as_slice()));

        let mut claimed = vec![false; keywords.len()];
        let mut groups = Vec::new();

        for bigram in self.eligible_roots(&bigram_counts) {
            let members = claim(&keywords, &mut claimed, |kw| kw.phrase.contains(bigram));
            if !members.is_empty() {
                debug!(root = %bigram, members = members.len(), "bigram root claimed keywords");
                groups.push(RootGroup {
                    root: bigram.clone(),
                    root_type: RootType::Bigram,
                    members,
                });
            }
        }

        for unigram in self.eligible_roots(&unigram_counts) {
            let members = claim(&keywords, &mut claimed, |kw| kw.tokens.contains(unigram));
            if !members.is_empty() {
                debug!(root = %unigram, members = members.len(), "unigram root claimed keywords");
                groups.push(RootGroup {
                    root: unigram.clone(),
                    root_type: RootType::Unigram,
                    members,
                });
            }
        }

        let unclaimed: Vec<usize> = claimed
            .iter()
            .enumerate()
            .filter(|(_, is_claimed)| !**is_claimed)
            .map(|(idx, _)| idx)
            .collect();
        let unclaimed_count = unclaimed.len();
        if !unclaimed.is_empty() {
            groups.push(RootGroup {
                root: UNCLAIMED_ROOT.to_string(),
                root_type: RootType::Unclaimed,
                members: unclaimed,
            });
        }

        info!(
            keywords = keywords.len(),
            groups = groups.len(),
            unclaimed = unclaimed_count,
            "root clustering complete"
        );
        groups
    }

    /// Roots at or above the frequency floor, most frequent first, ties by first sighting.
    fn eligible_roots<'a>(&self, counts: &'a IndexMap<String, usize>) -> Vec<&'a String> {
        let mut ranked: Vec<(&String, usize)> = counts
            .iter()
            .filter(|(_, count)| **count >= self.min_root_frequency)
            .map(|(root, count)| (root, *count))
            .collect();
        // Stable sort keeps IndexMap insertion order among equal counts.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().map(|(root, _)| root).collect()
    }
}

/// Count, per root, how many keywords contain it (each keyword counts once).
fn count_roots<'a, I>(per_keyword: I) -> IndexMap<String, usize>
where
    I: Iterator<Item = &'a [String]>,
{
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for roots in per_keyword {
        for root in roots {
            *counts.entry(root.clone()).or_insert(0) += 1;
        }
    }
    counts
}

fn claim<F>(keywords: &[KeywordRoots], claimed: &mut [bool], matches: F) -> Vec<usize>
where
    F: Fn(&KeywordRoots) -> bool,
{
    let mut members = Vec::new();
    for (idx, keyword) in keywords.iter().enumerate() {
        if !claimed[idx] && matches(keyword) {
            claimed[idx] = true;
            members.push(idx);
        }
    }
    members
}

/// Write each record's `root` from its group; unclaimed records get `None`.
pub fn assign_roots(records: &mut [KeywordRecord], groups: &[RootGroup]) {
    for group in groups {
        let root = match group.root_type {
            RootType::Unclaimed => None,
            RootType::Bigram | RootType::Unigram => Some(group.root.clone()),
        };
        for &idx in &group.members {
            if let Some(record) = records.get_mut(idx) {
                record.root = root.clone();
            }
        }
    }
}

/// Records in the on-target categories (relevant, design_specific), input order kept.
pub fn relevant_subset(records: &[KeywordRecord]) -> Vec<KeywordRecord> {
    records
        .iter()
        .filter(|record| record.category.is_on_target())
        .cloned()
        .collect()
}

/// Aggregate figures for one root group.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RootStats {
    pub root: RootPhrase,
    pub root_type: RootType,
    pub keyword_count: usize,
    pub total_search_volume: u64,
    /// Integer mean over members with a non-zero volume.
    pub avg_search_volume: u64,
    pub max_search_volume: u64,
    /// Distinct member categories in first-seen order.
    pub categories: Vec<Category>,
    pub is_design_specific: bool,
}

/// Compute per-group statistics; `records` must be the slice that was clustered.
pub fn root_statistics(groups: &[RootGroup], records: &[KeywordRecord]) -> Vec<RootStats> {
    groups
        .iter()
        .map(|group| {
            let members: Vec<&KeywordRecord> = group
                .members
                .iter()
                .filter_map(|idx| records.get(*idx))
                .collect();
            let total_search_volume: u64 = members.iter().map(|r| r.search_volume).sum();
            let max_search_volume = members.iter().map(|r| r.search_volume).max().unwrap_or(0);
            // Zero volume means "unknown" and stays out of the average.
            let with_volume = members.iter().filter(|r| r.search_volume > 0).count() as u64;
            let avg_search_volume = total_search_volume.checked_div(with_volume).unwrap_or(0);
            let mut categories = Vec::new();
            for record in &members {
                if !categories.contains(&record.category) {
                    categories.push(record.category);
                }
            }
            RootStats {
                root: group.root.clone(),
                root_type: group.root_type,
                keyword_count: members.len(),
                total_search_volume,
                avg_search_volume,
                max_search_volume,
                is_design_specific: categories.contains(&Category::DesignSpecific),
                categories,
            }
        })
        .collect()
}

/// Root statistics with a 1-based rank.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RankedRoot {
    pub rank: usize,
    #[serde(flatten)]
    pub stats: RootStats,
}

/// Rank roots: design-specific first, then the rest, each by total volume descending.
///
/// The unclaimed bucket is not a root and is left out.
pub fn rank_roots(stats: Vec<RootStats>) -> Vec<RankedRoot> {
    let (mut design, mut regular): (Vec<RootStats>, Vec<RootStats>) = stats
        .into_iter()
        .filter(|entry| entry.root_type != RootType::Unclaimed)
        .partition(|entry| entry.is_design_specific);
    design.sort_by(|a, b| b.total_search_volume.cmp(&a.total_search_volume));
    regular.sort_by(|a, b| b.total_search_volume.cmp(&a.total_search_volume));
    design
        .into_iter()
        .chain(regular)
        .enumerate()
        .map(|(idx, stats)| RankedRoot {
            rank: idx + 1,
            stats,
        })
        .collect()
}

/// First `n` ranked roots, optionally skipping design-specific ones.
pub fn top_roots(
    ranked: &[RankedRoot],
    n: usize,
    include_design_specific: bool,
) -> Vec<&RankedRoot> {
    ranked
        .iter()
        .filter(|entry| include_design_specific || !entry.stats.is_design_specific)
        .take(n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots_of(groups: &[RootGroup]) -> Vec<(&str, RootType, Vec<usize>)> {
        groups
            .iter()
            .map(|g| (g.root.as_str(), g.root_type, g.members.clone()))
            .collect()
    }

    #[test]
    fn bigrams_claim_before_unigrams() {
        let groups = RootClusterer::default().cluster_phrases(&[
            "freeze dried strawberries",
            "freeze dried mango",
            "dried strawberries",
        ]);
        assert_eq!(
            roots_of(&groups),
            vec![
                ("freeze dried", RootType::Bigram, vec![0, 1]),
                ("dried strawberries", RootType::Bigram, vec![2]),
            ]
        );
    }

    #[test]
    fn unigrams_match_whole_tokens_and_leftovers_are_unclaimed() {
        let groups = RootClusterer::default().cluster_phrases(&[
            "mango slices",
            "dried mango",
            "mangoes",
            "apple chips",
        ]);
        assert_eq!(
            roots_of(&groups),
            vec![
                ("mango", RootType::Unigram, vec![0, 1]),
                ("unclaimed", RootType::Unclaimed, vec![2, 3]),
            ]
        );
    }

    #[test]
    fn stop_word_only_bigrams_are_skipped() {
        let groups = RootClusterer::default().cluster_phrases(&["snack for the kids", "for the win"]);
        assert!(groups.iter().all(|g| g.root != "for the"));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].root_type, RootType::Unclaimed);
    }

    #[test]
    fn frequency_ties_follow_first_sighting() {
        let groups = RootClusterer::default().cluster_phrases(&[
            "red apple",
            "green pear",
            "green pear slices",
            "red apple chips",
        ]);
        assert_eq!(groups[0].root, "red apple");
        assert_eq!(groups[1].root, "green pear");
    }

    #[test]
    fn repeated_bigram_in_one_keyword_counts_once() {
        let groups =
            RootClusterer::default().cluster_phrases(&["dried mango dried mango", "fresh fruit"]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].root_type, RootType::Unclaimed);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let phrases: [&str; 0] = [];
        assert!(RootClusterer::default().cluster_phrases(&phrases).is_empty());
    }

    #[test]
    fn statistics_and_ranking_put_design_roots_first() {
        let records = vec![
            KeywordRecord::new("dried mango", 100, Category::Relevant),
            KeywordRecord::new("dried mango slices", 50, Category::Relevant),
            KeywordRecord::new("kawaii sticker", 10, Category::DesignSpecific),
            KeywordRecord::new("kawaii sticker pack", 5, Category::Relevant),
            KeywordRecord::new("lonely", 1, Category::Relevant),
        ];
        let groups = RootClusterer::default().cluster(&records);
        let stats = root_statistics(&groups, &records);
        let mango = stats.iter().find(|s| s.root == "dried mango").unwrap();
        assert_eq!(mango.keyword_count, 2);
        assert_eq!(mango.total_search_volume, 150);
        assert_eq!(mango.avg_search_volume, 75);
        assert_eq!(mango.max_search_volume, 100);

        let ranked = rank_roots(stats);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].stats.root, "kawaii sticker");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].stats.root, "dried mango");
        assert_eq!(
            top_roots(&ranked, 5, false)
                .iter()
                .map(|r| r.stats.root.as_str())
                .collect::<Vec<_>>(),
            vec!["dried mango"]
        );
    }

    #[test]
    fn average_volume_skips_members_without_volume() {
        let records = vec![
            KeywordRecord::new("dried mango", 90, Category::Relevant),
            KeywordRecord::new("dried mango chips", 0, Category::Relevant),
            KeywordRecord::new("dried mango bulk", 30, Category::Relevant),
            KeywordRecord::new("candle", 0, Category::Irrelevant),
        ];
        let groups = RootClusterer::default().cluster(&records);
        let stats = root_statistics(&groups, &records);
        assert_eq!(stats[0].root, "dried mango");
        assert_eq!(stats[0].keyword_count, 3);
        assert_eq!(stats[0].avg_search_volume, 60);
        let unclaimed = stats.last().unwrap();
        assert_eq!(unclaimed.root_type, RootType::Unclaimed);
        assert_eq!(unclaimed.avg_search_volume, 0);
    }

    #[test]
    fn assign_roots_writes_claiming_root() {
        let mut records = vec![
            KeywordRecord::new("dried mango", 1, Category::Relevant),
            KeywordRecord::new("dried mango chips", 1, Category::Relevant),
            KeywordRecord::new("apple", 1, Category::Relevant),
        ];
        let groups = RootClusterer::default().cluster(&records);
        assign_roots(&mut records, &groups);
        assert_eq!(records[0].root.as_deref(), Some("dried mango"));
        assert_eq!(records[1].root.as_deref(), Some("dried mango"));
        assert_eq!(records[2].root, None);
    }
}
