use crate::data::Category;

/// Constants used by token normalization.
pub mod normalizer {
    /// Closed stop-word list: articles, prepositions, conjunctions, auxiliary verbs.
    pub const STOP_WORDS: &[&str] = &[
        "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "up", "about", "into", "through", "during", "before", "after", "above", "below",
        "between", "among", "against", "without", "within", "as", "is", "are", "was", "were",
        "be", "been", "being", "have", "has", "had", "do", "does", "did", "will", "would",
        "could", "should", "may", "might", "can", "must", "shall",
    ];
    /// Pronouns and articles stripped from phrase edges during variant grouping.
    pub const PRONOUNS_ARTICLES: &[&str] = &[
        "a", "an", "the", "this", "that", "these", "those", "my", "your", "his", "her", "its",
        "our", "their",
    ];
}

/// Constants used by root clustering.
pub mod clustering {
    /// Minimum number of distinct keywords a root must appear in to claim members.
    pub const MIN_ROOT_FREQUENCY: usize = 2;
    /// Root label of the synthetic group holding keywords no root claimed.
    pub const UNCLAIMED_ROOT: &str = "unclaimed";
}

/// Constants used by variant detection.
pub mod variants {
    /// Runner-up volume must reach this fraction of the top volume to count as near-tied.
    pub const NEAR_TIE_RATIO: f64 = 0.8;
}

/// Constants used by the verification pipeline.
pub mod verification {
    /// Default number of concurrent scrape calls.
    pub const DEFAULT_SCRAPE_CONCURRENCY: usize = 5;
    /// Default number of concurrent classifier calls.
    pub const DEFAULT_VERIFY_CONCURRENCY: usize = 5;
    /// Competitor titles forwarded to the classifier per keyword.
    pub const MAX_COMPETITOR_TITLES: usize = 8;
    /// Default start of the progress sub-range owned by verification.
    pub const DEFAULT_PROGRESS_BASELINE: u8 = 95;
    /// Default width of the progress sub-range owned by verification.
    pub const DEFAULT_PROGRESS_SPAN: u8 = 4;
    /// Reasoning recorded when a scrape fails or returns nothing.
    pub const NO_TITLES_REASON: &str = "no competitor titles found";
    /// Prefix for reasoning recorded when the classifier fails.
    pub const CLASSIFIER_ERROR_PREFIX: &str = "verification error";
    /// Prefix written into a record's reasoning after a relevant verdict.
    pub const VERIFIED_RELEVANT_PREFIX: &str = "Verified as relevant";
    /// Prefix written into a record's reasoning after an irrelevant verdict.
    pub const VERIFIED_IRRELEVANT_PREFIX: &str = "Verified as irrelevant";
    /// Competitor titles sharing at least this many content tokens count as a match.
    pub const DEFAULT_MIN_SHARED_TOKENS: usize = 2;
    /// Match percentage at or above which the overlap classifier says relevant.
    pub const DEFAULT_RELEVANT_MATCH_PERCENTAGE: u8 = 50;
}

/// Constants used by conflict resolution.
pub mod resolver {
    /// Reasoning prefix when a duplicate phrase carried incompatible categories.
    pub const CONFLICT_REASON_PREFIX: &str = "conflicting categories across sources";
    /// Reasoning when a duplicate occurrence is forced to branded.
    pub const BRANDED_ELSEWHERE_REASON: &str = "branded in another source row";
    /// Default minimum relevance score kept by the export filter.
    pub const MIN_EXPORT_SCORE: u8 = 5;
}

/// Constants used by competitor modifier categorization.
pub mod modifiers {
    /// Number of top relevant keywords whose words are never treated as modifiers.
    pub const TOP_RELEVANT_KEYWORDS: usize = 3;
    /// Reasoning written when a keyword is promoted to competitor_relevant.
    pub const COMPETITOR_RELEVANT_REASON: &str =
        "market demand exists for this variation, but we do not offer it";
    /// Words that never count as modifiers.
    pub const MODIFIER_STOP_WORDS: &[&str] = &[
        "for", "on", "at", "in", "to", "the", "a", "an", "and", "or", "but", "with", "by",
        "from", "as", "is", "was", "are", "be", "been", "being", "have", "has", "had", "do",
        "does", "did", "will", "would", "could", "should", "may", "might", "must", "can", "of",
        "that", "this", "it", "which", "who", "when", "where", "why", "how", "all", "each",
        "every", "both", "few", "more", "most", "other", "some", "such", "no", "nor", "not",
        "only", "same", "so", "than", "too", "very", "just", "also", "up", "down", "out", "off",
        "over", "under", "about", "into", "through", "during", "before", "after", "above",
        "below", "between", "among",
    ];
}

/// Constants used by listing keyword selection.
pub mod selection {
    /// Regular root representatives placed in the title, main keyword included.
    pub const TITLE_KEYWORDS: usize = 4;
    /// Design-specific representatives placed in the title when offered.
    pub const TITLE_DESIGN_KEYWORDS: usize = 2;
    /// Keywords spread over the bullets.
    pub const BULLET_KEYWORDS: usize = 12;
    /// Bullets receiving keywords.
    pub const BULLET_COUNT: usize = 5;
    /// Floor on keywords per bullet; the last bullet takes the remainder.
    pub const MIN_KEYWORDS_PER_BULLET: usize = 2;
}

/// Canonical relevance score for each category.
pub const fn score_band(category: Category) -> u8 {
    match category {
        Category::Branded => 0,
        Category::Irrelevant => 3,
        Category::Outlier => 4,
        Category::CompetitorRelevant => 6,
        Category::Relevant => 8,
        Category::DesignSpecific => 10,
    }
}
