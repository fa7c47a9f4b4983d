use serde::Deserialize;

use crate::constants::clustering::MIN_ROOT_FREQUENCY;
use crate::constants::resolver::MIN_EXPORT_SCORE;
use crate::constants::selection::{
    BULLET_COUNT, BULLET_KEYWORDS, TITLE_DESIGN_KEYWORDS, TITLE_KEYWORDS,
};
use crate::constants::variants::NEAR_TIE_RATIO;
use crate::constants::verification::{
    DEFAULT_PROGRESS_BASELINE, DEFAULT_PROGRESS_SPAN, DEFAULT_SCRAPE_CONCURRENCY,
    DEFAULT_VERIFY_CONCURRENCY, MAX_COMPETITOR_TITLES,
};
use crate::data::Category;
use crate::errors::TriageError;

/// Controls how roots are chosen during clustering.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Roots seen in fewer distinct keywords than this never claim members.
    pub min_root_frequency: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_root_frequency: MIN_ROOT_FREQUENCY,
        }
    }
}

/// Controls representative selection inside a variant group.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    /// Members with `volume >= near_tie_ratio * top_volume` are treated as tied with the top.
    pub near_tie_ratio: f64,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            near_tie_ratio: NEAR_TIE_RATIO,
        }
    }
}

/// Sub-range of an outer progress bar reserved for one stage.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProgressRange {
    /// Percent reported before any work completes.
    pub baseline: u8,
    /// Percent added once every task has completed.
    pub span: u8,
}

impl Default for ProgressRange {
    fn default() -> Self {
        Self {
            baseline: DEFAULT_PROGRESS_BASELINE,
            span: DEFAULT_PROGRESS_SPAN,
        }
    }
}

impl ProgressRange {
    /// Percent for `completed` of `total` tasks: `floor(baseline + completed / total * span)`.
    pub fn percent(&self, completed: usize, total: usize) -> u8 {
        if total == 0 {
            return self.baseline.saturating_add(self.span).min(100);
        }
        let advanced = completed.min(total) * usize::from(self.span) / total;
        (usize::from(self.baseline) + advanced).min(100) as u8
    }
}

/// Controls the verification pipeline.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Max concurrent scrape calls.
    pub scrape_concurrency: usize,
    /// Max concurrent classifier calls.
    pub verify_concurrency: usize,
    /// Competitor titles forwarded to the classifier per keyword.
    pub max_competitor_titles: usize,
    /// Progress sub-range this pipeline reports into.
    pub progress: ProgressRange,
    /// Categories whose keywords are submitted for verification.
    pub candidate_categories: Vec<Category>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            scrape_concurrency: DEFAULT_SCRAPE_CONCURRENCY,
            verify_concurrency: DEFAULT_VERIFY_CONCURRENCY,
            max_competitor_titles: MAX_COMPETITOR_TITLES,
            progress: ProgressRange::default(),
            candidate_categories: vec![Category::Irrelevant, Category::CompetitorRelevant],
        }
    }
}

/// Controls which resolved records are kept for export.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Records scoring below this are dropped unless branded.
    pub min_relevance_score: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            min_relevance_score: MIN_EXPORT_SCORE,
        }
    }
}

/// Controls how root representatives are spent on title and bullets.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Regular keywords in the title, main keyword included.
    pub title_keywords: usize,
    /// Design-specific keywords in the title when design keywords are offered.
    pub title_design_keywords: usize,
    /// Keywords spread over the bullets.
    pub bullet_keywords: usize,
    pub bullet_count: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            title_keywords: TITLE_KEYWORDS,
            title_design_keywords: TITLE_DESIGN_KEYWORDS,
            bullet_keywords: BULLET_KEYWORDS,
            bullet_count: BULLET_COUNT,
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub clustering: ClusterConfig,
    pub variants: VariantConfig,
    pub verification: VerificationConfig,
    pub selection: SelectionConfig,
    pub export: ExportConfig,
}

impl TriageConfig {
    /// Reject settings the core cannot run with.
    pub fn validate(&self) -> Result<(), TriageError> {
        if self.clustering.min_root_frequency == 0 {
            return Err(TriageError::Configuration(
                "clustering.min_root_frequency must be at least 1".into(),
            ));
        }
        let ratio = self.variants.near_tie_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(TriageError::Configuration(format!(
                "variants.near_tie_ratio must be in (0, 1], got {ratio}"
            )));
        }
        let verification = &self.verification;
        if verification.scrape_concurrency == 0 || verification.verify_concurrency == 0 {
            return Err(TriageError::Configuration(
                "verification concurrency must be at least 1 for both pools".into(),
            ));
        }
        if verification.max_competitor_titles == 0 {
            return Err(TriageError::Configuration(
                "verification.max_competitor_titles must be at least 1".into(),
            ));
        }
        if self.selection.bullet_count == 0 {
            return Err(TriageError::Configuration(
                "selection.bullet_count must be at least 1".into(),
            ));
        }
        let progress = verification.progress;
        if u16::from(progress.baseline) + u16::from(progress.span) > 100 {
            return Err(TriageError::Configuration(format!(
                "progress range {}+{} exceeds 100",
                progress.baseline, progress.span
            )));
        }
        Ok(())
    }
}
