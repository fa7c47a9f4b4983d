#![doc = include_str!("../README.md")]

/// Triage configuration types.
pub mod config;
/// Centralized constants: word lists, thresholds, reasoning strings, score bands.
pub mod constants;
/// Keyword records, categories, and verification results.
pub mod data;
/// Reusable example runners shared by downstream crates.
pub mod example_apps;
/// Aggregate metrics helpers.
pub mod metrics;
/// Competitor modifier categorization.
pub mod modifiers;
/// Token normalization.
pub mod normalizer;
/// Cross-source category conflict resolution.
pub mod resolver;
/// Root clustering and root statistics.
pub mod roots;
/// Title and bullet keyword selection from ranked roots.
pub mod selector;
/// Shared type aliases.
pub mod types;
/// Text and number helpers.
pub mod utils;
/// Near-duplicate keyword detection.
pub mod variants;
/// Concurrent scrape-and-classify verification.
pub mod verification;

mod errors;

pub use config::{
    ClusterConfig, ExportConfig, ProgressRange, SelectionConfig, TriageConfig, VariantConfig,
    VerificationConfig,
};
pub use data::{BrandStatus, Category, KeywordRecord, KeywordRow, Verdict, VerificationResult};
pub use errors::TriageError;
pub use metrics::{CategoryBreakdown, CategoryShare, category_breakdown};
pub use resolver::{resolve, retain_exportable};
pub use roots::{RootClusterer, RootGroup, RootType};
pub use selector::{KeywordSelection, KeywordSelector, RootRepresentative};
pub use types::{
    CompetitorTitle, LogMessage, Modifier, NormalizedPhrase, Phrase, Reasoning, RootPhrase,
    VariantKey,
};
pub use variants::{VariantDetector, VariantGroup, VariantType};
pub use verification::{
    ClassificationRequest, ProductListing, ProgressSink, RelevanceClassifier, ScrapePool,
    TitleScraper, VerificationPipeline, VerificationResults, VerifyPool,
};
