use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::score_band;
use crate::constants::verification::{CLASSIFIER_ERROR_PREFIX, NO_TITLES_REASON};
use crate::utils::{normalize_phrase, parse_search_volume};

pub use crate::types::{NormalizedPhrase, Phrase, Reasoning, RootPhrase};

/// Relevance category assigned to a keyword.
///
/// Declaration order doubles as the display order used by reports.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Irrelevant,
    Outlier,
    Relevant,
    DesignSpecific,
    CompetitorRelevant,
    Branded,
}

impl Category {
    /// Every category in declaration order.
    pub const ALL: [Category; 6] = [
        Category::Irrelevant,
        Category::Outlier,
        Category::Relevant,
        Category::DesignSpecific,
        Category::CompetitorRelevant,
        Category::Branded,
    ];

    /// Wire name of the category (matches the serde representation).
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Irrelevant => "irrelevant",
            Category::Outlier => "outlier",
            Category::Relevant => "relevant",
            Category::DesignSpecific => "design_specific",
            Category::CompetitorRelevant => "competitor_relevant",
            Category::Branded => "branded",
        }
    }

    /// Canonical relevance score carried by this category.
    pub const fn score(self) -> u8 {
        score_band(self)
    }

    /// `true` for the categories treated as on-target for our product.
    pub const fn is_on_target(self) -> bool {
        matches!(self, Category::Relevant | Category::DesignSpecific)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a keyword mentions a brand or trademark.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BrandStatus {
    Branded,
    NonBranded,
}

impl BrandStatus {
    fn for_category(category: Category) -> Self {
        if category == Category::Branded {
            BrandStatus::Branded
        } else {
            BrandStatus::NonBranded
        }
    }
}

/// Canonical keyword record flowing through clustering, verification, and resolution.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordRecord {
    /// Phrase exactly as supplied.
    pub phrase: Phrase,
    /// Lowercased, trimmed, whitespace-collapsed phrase.
    pub normalized_phrase: NormalizedPhrase,
    /// Monthly search volume (missing or unparseable input becomes 0).
    pub search_volume: u64,
    pub category: Category,
    /// Score derived from `category` through the canonical band.
    pub relevance_score: u8,
    pub reasoning: Reasoning,
    pub brand_status: BrandStatus,
    /// Root assigned by clustering, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<RootPhrase>,
}

impl KeywordRecord {
    /// Build a record with the canonical score for `category` and empty reasoning.
    pub fn new(phrase: impl Into<Phrase>, search_volume: u64, category: Category) -> Self {
        let phrase = phrase.into();
        let normalized_phrase = normalize_phrase(&phrase);
        Self {
            phrase,
            normalized_phrase,
            search_volume,
            category,
            relevance_score: category.score(),
            reasoning: Reasoning::new(),
            brand_status: BrandStatus::for_category(category),
            root: None,
        }
    }

    /// Builder-style reasoning override.
    pub fn with_reasoning(mut self, reasoning: impl Into<Reasoning>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Move the record to `category`, rewriting score and reasoning.
    pub fn set_category(&mut self, category: Category, reasoning: impl Into<Reasoning>) {
        self.category = category;
        self.relevance_score = category.score();
        self.reasoning = reasoning.into();
        if category == Category::Branded {
            self.brand_status = BrandStatus::Branded;
        }
    }

    /// Convert an ingested row into a record.
    ///
    /// An explicit brand status is honored, except that a branded category is
    /// always branded.
    pub fn from_row(row: KeywordRow) -> Self {
        let mut record = Self::new(row.phrase, row.search_volume, row.category);
        let category = record.category;
        if let Some(status) = row.brand_status.filter(|_| category != Category::Branded) {
            record.brand_status = status;
        }
        if let Some(reasoning) = row.reasoning {
            record.reasoning = reasoning;
        }
        record
    }
}

/// Loose ingestion shape accepted from JSON exports of keyword research tools.
#[derive(Clone, Debug, Deserialize)]
pub struct KeywordRow {
    #[serde(alias = "keyword", alias = "Keyword Phrase")]
    pub phrase: Phrase,
    /// Number or string such as `"1,234"`; missing, negative, or garbage values become 0.
    #[serde(
        default,
        alias = "Search Volume",
        deserialize_with = "deserialize_search_volume"
    )]
    pub search_volume: u64,
    pub category: Category,
    #[serde(default)]
    pub brand_status: Option<BrandStatus>,
    #[serde(default)]
    pub reasoning: Option<Reasoning>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVolume {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

fn deserialize_search_volume<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawVolume>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawVolume::Unsigned(value)) => value,
        Some(RawVolume::Signed(value)) => u64::try_from(value).unwrap_or(0),
        Some(RawVolume::Float(value)) if value.is_finite() && value > 0.0 => value.floor() as u64,
        Some(RawVolume::Float(_)) | None => 0,
        Some(RawVolume::Text(text)) => parse_search_volume(&text),
    })
}

/// Binary outcome of relevance classification.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Relevant,
    Irrelevant,
}

/// Terminal result of verifying one keyword.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationResult {
    pub verdict: Verdict,
    /// Share of competitor titles matching our product, 0-100.
    pub match_percentage: u8,
    pub reasoning: Reasoning,
}

impl VerificationResult {
    /// Build a result, clamping the match percentage into 0-100.
    pub fn new(verdict: Verdict, match_percentage: u8, reasoning: impl Into<Reasoning>) -> Self {
        Self {
            verdict,
            match_percentage: match_percentage.min(100),
            reasoning: reasoning.into(),
        }
    }

    /// Conservative result for a keyword whose scrape failed or came back empty.
    pub fn no_titles() -> Self {
        Self::new(Verdict::Irrelevant, 0, NO_TITLES_REASON)
    }

    /// Conservative result for a keyword whose classification failed.
    pub fn classifier_error(error: impl fmt::Display) -> Self {
        Self::new(
            Verdict::Irrelevant,
            0,
            format!("{CLASSIFIER_ERROR_PREFIX}: {error}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_derives_score_and_brand_status() {
        let record = KeywordRecord::new("  Freeze Dried  Mango ", 120, Category::Branded);
        assert_eq!(record.normalized_phrase, "freeze dried mango");
        assert_eq!(record.relevance_score, 0);
        assert_eq!(record.brand_status, BrandStatus::Branded);

        let plain = KeywordRecord::new("mango", 5, Category::Relevant);
        assert_eq!(plain.relevance_score, 8);
        assert_eq!(plain.brand_status, BrandStatus::NonBranded);
    }

    #[test]
    fn set_category_overwrites_score_and_reasoning() {
        let mut record =
            KeywordRecord::new("mango", 5, Category::Relevant).with_reasoning("initial");
        record.set_category(Category::Irrelevant, "second opinion");
        assert_eq!(record.category, Category::Irrelevant);
        assert_eq!(record.relevance_score, 3);
        assert_eq!(record.reasoning, "second opinion");
    }

    #[test]
    fn rows_accept_numeric_and_text_volumes() {
        let rows: Vec<KeywordRow> = serde_json::from_str(
            r#"[
                {"phrase": "a", "search_volume": 12, "category": "relevant"},
                {"keyword": "b", "search_volume": "1,234", "category": "outlier"},
                {"Keyword Phrase": "c", "Search Volume": -4, "category": "irrelevant"},
                {"phrase": "d", "search_volume": null, "category": "branded"},
                {"phrase": "e", "category": "design_specific"},
                {"phrase": "f", "search_volume": 17.9, "category": "relevant"}
            ]"#,
        )
        .unwrap();
        let volumes: Vec<u64> = rows.iter().map(|row| row.search_volume).collect();
        assert_eq!(volumes, vec![12, 1234, 0, 0, 0, 17]);
    }

    #[test]
    fn from_row_keeps_explicit_brand_status() {
        let row: KeywordRow = serde_json::from_str(
            r#"{"phrase": "Acme Mango", "search_volume": 3, "category": "irrelevant", "brand_status": "branded"}"#,
        )
        .unwrap();
        let record = KeywordRecord::from_row(row);
        assert_eq!(record.brand_status, BrandStatus::Branded);
        assert_eq!(record.category, Category::Irrelevant);
    }

    #[test]
    fn branded_category_wins_over_explicit_non_branded_status() {
        let row: KeywordRow = serde_json::from_str(
            r#"{"phrase": "Acme", "category": "branded", "brand_status": "non_branded"}"#,
        )
        .unwrap();
        assert_eq!(KeywordRecord::from_row(row).brand_status, BrandStatus::Branded);
    }

    #[test]
    fn verification_result_clamps_percentage() {
        let result = VerificationResult::new(Verdict::Relevant, 250, "ok");
        assert_eq!(result.match_percentage, 100);
        assert_eq!(
            VerificationResult::classifier_error("timeout").reasoning,
            "verification error: timeout"
        );
    }
}
