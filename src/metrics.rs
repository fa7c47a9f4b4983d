use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::{Category, KeywordRecord};

/// Category mix of a keyword set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub total: usize,
    pub total_search_volume: u64,
    /// Largest category first; equal counts follow category declaration order.
    pub per_category: Vec<CategoryShare>,
}

/// One category's slice of the keyword set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: Category,
    pub count: usize,
    pub share: f64,
    pub search_volume: u64,
}

impl CategoryBreakdown {
    /// Share entry for `category`, if any record carries it.
    pub fn get(&self, category: Category) -> Option<&CategoryShare> {
        self.per_category
            .iter()
            .find(|entry| entry.category == category)
    }
}

/// Count records per category. Returns `None` for an empty set.
pub fn category_breakdown(records: &[KeywordRecord]) -> Option<CategoryBreakdown> {
    if records.is_empty() {
        return None;
    }
    let mut tallies: BTreeMap<Category, (usize, u64)> = BTreeMap::new();
    for record in records {
        let tally = tallies.entry(record.category).or_insert((0, 0));
        tally.0 += 1;
        tally.1 = tally.1.saturating_add(record.search_volume);
    }
    let total = records.len();
    let total_search_volume = tallies.values().map(|(_, volume)| *volume).sum();
    let mut per_category: Vec<CategoryShare> = tallies
        .into_iter()
        .map(|(category, (count, search_volume))| CategoryShare {
            category,
            count,
            share: count as f64 / total as f64,
            search_volume,
        })
        .collect();
    per_category.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    Some(CategoryBreakdown {
        total,
        total_search_volume,
        per_category,
    })
}
