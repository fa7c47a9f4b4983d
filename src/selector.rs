//! Keyword selection for listing copy.
//!
//! Every ranked root contributes one representative keyword: the best variant
//! of its members when one of its members sits in a variant group, otherwise
//! its highest-volume member. Representatives are then spent on the title
//! (main keyword, a few design-specific ones, then filler) and the remainder
//! is spread over the bullets.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{SelectionConfig, VariantConfig};
use crate::constants::selection::MIN_KEYWORDS_PER_BULLET;
use crate::data::{Category, KeywordRecord};
use crate::roots::{RankedRoot, RootGroup};
use crate::types::{NormalizedPhrase, Phrase, RootPhrase};
use crate::utils::normalize_phrase;
use crate::variants::{VariantDetector, VariantGroup};

/// The keyword chosen to stand for one root.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RootRepresentative {
    pub root: RootPhrase,
    pub keyword: Phrase,
    pub search_volume: u64,
    pub category: Category,
    pub is_design_specific: bool,
    pub root_total_volume: u64,
    pub root_keyword_count: usize,
}

/// Keywords placed in the title.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct TitleSelection {
    pub main_keyword: Option<RootRepresentative>,
    pub design_keywords: Vec<RootRepresentative>,
    pub additional_keywords: Vec<RootRepresentative>,
    pub total_search_volume: u64,
}

impl TitleSelection {
    /// Main keyword, then design keywords, then additional keywords.
    pub fn keywords(&self) -> impl Iterator<Item = &RootRepresentative> {
        self.main_keyword
            .iter()
            .chain(&self.design_keywords)
            .chain(&self.additional_keywords)
    }

    pub fn len(&self) -> usize {
        self.keywords().count()
    }

    pub fn is_empty(&self) -> bool {
        self.main_keyword.is_none() && self.design_keywords.is_empty()
    }
}

/// Keywords assigned to one bullet.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct BulletAssignment {
    /// 1-based.
    pub bullet_number: usize,
    pub keywords: Vec<RootRepresentative>,
    pub total_search_volume: u64,
}

/// Keywords spread over the bullets; empty bullets are omitted.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct BulletSelection {
    pub assignments: Vec<BulletAssignment>,
    /// Every bullet keyword, volume descending.
    pub keywords: Vec<RootRepresentative>,
    pub total_search_volume: u64,
}

/// Title and bullet keywords plus the representatives they were drawn from.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct KeywordSelection {
    pub title: TitleSelection,
    pub bullets: BulletSelection,
    pub representatives: Vec<RootRepresentative>,
    pub design_specific_count: usize,
    pub regular_count: usize,
    pub include_design_specific: bool,
}

/// A same-root keyword with more search volume than the one in use.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Alternative {
    pub current_keyword: Phrase,
    pub alternative_keyword: Phrase,
    pub root: RootPhrase,
    pub current_volume: u64,
    pub alternative_volume: u64,
    pub improvement: u64,
    /// Improvement relative to the current volume, one decimal; 0 when the current volume is 0.
    pub improvement_percent: f64,
}

/// Member phrases of one variant group and the phrase it keeps.
struct VariantSet {
    members: HashSet<NormalizedPhrase>,
    best: NormalizedPhrase,
}

pub struct KeywordSelector {
    config: SelectionConfig,
    detector: VariantDetector,
    variant_sets: Vec<VariantSet>,
}

impl Default for KeywordSelector {
    fn default() -> Self {
        Self::new(&SelectionConfig::default(), &VariantConfig::default())
    }
}

impl KeywordSelector {
    pub fn new(config: &SelectionConfig, variants: &VariantConfig) -> Self {
        let mut config = config.clone();
        config.bullet_count = config.bullet_count.max(1);
        Self {
            config,
            detector: VariantDetector::new(variants),
            variant_sets: Vec::new(),
        }
    }

    /// Use detected variant groups; `keywords` is the slice they were detected over.
    pub fn with_variant_groups(
        mut self,
        groups: &[VariantGroup],
        keywords: &[KeywordRecord],
    ) -> Self {
        self.variant_sets = groups
            .iter()
            .filter_map(|group| {
                let best = keywords.get(group.representative)?;
                let members = group
                    .members
                    .iter()
                    .filter_map(|idx| keywords.get(*idx))
                    .map(|record| record.normalized_phrase.clone())
                    .collect();
                Some(VariantSet {
                    members,
                    best: best.normalized_phrase.clone(),
                })
            })
            .collect();
        self
    }

    /// One representative per ranked root, in rank order.
    ///
    /// `groups` and `records` are the clustering input and output the ranking
    /// was computed from.
    pub fn select_root_representatives(
        &self,
        ranked: &[RankedRoot],
        groups: &[RootGroup],
        records: &[KeywordRecord],
    ) -> Vec<RootRepresentative> {
        let mut representatives = Vec::with_capacity(ranked.len());
        for entry in ranked {
            let stats = &entry.stats;
            let Some(group) = groups
                .iter()
                .find(|group| group.root == stats.root && group.root_type == stats.root_type)
            else {
                debug!(root = %stats.root, "ranked root has no group");
                continue;
            };
            let mut members: Vec<&KeywordRecord> = group
                .members
                .iter()
                .filter_map(|idx| records.get(*idx))
                .collect();
            // Stable: equal volumes keep claim order.
            members.sort_by(|a, b| b.search_volume.cmp(&a.search_volume));
            let Some(best) = self.best_variant(&members).or(members.first().copied()) else {
                continue;
            };
            representatives.push(RootRepresentative {
                root: stats.root.clone(),
                keyword: best.phrase.clone(),
                search_volume: best.search_volume,
                category: best.category,
                is_design_specific: stats.is_design_specific,
                root_total_volume: stats.total_search_volume,
                root_keyword_count: stats.keyword_count,
            });
        }
        representatives
    }

    /// Spend representatives on the title and bullets.
    ///
    /// Design-specific representatives are only used when
    /// `include_design_specific` is set, i.e. when the current listing already
    /// targets that design.
    pub fn select(
        &self,
        representatives: Vec<RootRepresentative>,
        include_design_specific: bool,
    ) -> KeywordSelection {
        let (design, regular): (Vec<_>, Vec<_>) = representatives
            .iter()
            .cloned()
            .partition(|rep| rep.is_design_specific);
        let offered: &[RootRepresentative] = if include_design_specific {
            &design
        } else {
            &[]
        };

        let title = self.select_title(&regular, offered);
        let bullets = self.select_bullets(&regular, offered, &title);
        info!(
            representatives = representatives.len(),
            title_keywords = title.len(),
            bullet_keywords = bullets.keywords.len(),
            include_design_specific,
            "keyword selection complete"
        );
        KeywordSelection {
            title,
            bullets,
            design_specific_count: design.len(),
            regular_count: regular.len(),
            representatives,
            include_design_specific,
        }
    }

    /// Same-root keywords with more volume than `current`, largest gain first.
    ///
    /// `records` must carry roots (see [`crate::roots::assign_roots`]).
    /// Variants of `current` are never suggested.
    pub fn find_better_alternatives(
        &self,
        current: &str,
        records: &[KeywordRecord],
    ) -> Vec<Alternative> {
        let key = normalize_phrase(current);
        let Some(current_record) = records.iter().find(|r| r.normalized_phrase == key) else {
            return Vec::new();
        };
        let Some(root) = current_record.root.as_deref() else {
            return Vec::new();
        };
        let current_volume = current_record.search_volume;

        let mut alternatives: Vec<Alternative> = records
            .iter()
            .filter(|record| record.root.as_deref() == Some(root))
            .filter(|record| record.normalized_phrase != key)
            .filter(|record| record.search_volume > current_volume)
            .filter(|record| !self.detector.is_variant(current, &record.phrase))
            .map(|record| {
                let improvement = record.search_volume - current_volume;
                let improvement_percent = if current_volume > 0 {
                    (improvement as f64 / current_volume as f64 * 1000.0).round() / 10.0
                } else {
                    0.0
                };
                Alternative {
                    current_keyword: current_record.phrase.clone(),
                    alternative_keyword: record.phrase.clone(),
                    root: root.to_string(),
                    current_volume,
                    alternative_volume: record.search_volume,
                    improvement,
                    improvement_percent,
                }
            })
            .collect();
        alternatives.sort_by(|a, b| b.improvement.cmp(&a.improvement));
        alternatives
    }

    /// Best variant among `members`, taken from the first variant group any of
    /// them belongs to whose kept phrase is also a member.
    fn best_variant<'a>(&self, members: &[&'a KeywordRecord]) -> Option<&'a KeywordRecord> {
        for set in &self.variant_sets {
            if !members
                .iter()
                .any(|record| set.members.contains(&record.normalized_phrase))
            {
                continue;
            }
            if let Some(found) = members
                .iter()
                .find(|record| record.normalized_phrase == set.best)
            {
                return Some(*found);
            }
        }
        None
    }

    fn select_title(
        &self,
        regular: &[RootRepresentative],
        design: &[RootRepresentative],
    ) -> TitleSelection {
        let main_keyword = regular.first().cloned();
        let design_keywords: Vec<RootRepresentative> = design
            .iter()
            .take(self.config.title_design_keywords)
            .cloned()
            .collect();
        let additional_keywords: Vec<RootRepresentative> = regular
            .iter()
            .skip(1)
            .take(self.config.title_keywords.saturating_sub(1))
            .cloned()
            .collect();
        let mut title = TitleSelection {
            main_keyword,
            design_keywords,
            additional_keywords,
            total_search_volume: 0,
        };
        title.total_search_volume = title.keywords().map(|rep| rep.search_volume).sum();
        title
    }

    fn select_bullets(
        &self,
        regular: &[RootRepresentative],
        design: &[RootRepresentative],
        title: &TitleSelection,
    ) -> BulletSelection {
        let used: HashSet<&str> = title.keywords().map(|rep| rep.keyword.as_str()).collect();
        let mut keywords: Vec<RootRepresentative> = regular
            .iter()
            .chain(design)
            .filter(|rep| !used.contains(rep.keyword.as_str()))
            .cloned()
            .collect();
        keywords.sort_by(|a, b| b.search_volume.cmp(&a.search_volume));
        keywords.truncate(self.config.bullet_keywords);

        let bullet_count = self.config.bullet_count;
        let per_bullet = (keywords.len() / bullet_count).max(MIN_KEYWORDS_PER_BULLET);
        let mut assignments = Vec::new();
        for idx in 0..bullet_count {
            let start = (idx * per_bullet).min(keywords.len());
            let end = if idx + 1 == bullet_count {
                keywords.len()
            } else {
                (start + per_bullet).min(keywords.len())
            };
            let slice = &keywords[start..end];
            if slice.is_empty() {
                continue;
            }
            assignments.push(BulletAssignment {
                bullet_number: idx + 1,
                keywords: slice.to_vec(),
                total_search_volume: slice.iter().map(|rep| rep.search_volume).sum(),
            });
        }

        BulletSelection {
            total_search_volume: keywords.iter().map(|rep| rep.search_volume).sum(),
            assignments,
            keywords,
        }
    }
}
