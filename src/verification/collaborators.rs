use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::constants::verification::{
    DEFAULT_MIN_SHARED_TOKENS, DEFAULT_RELEVANT_MATCH_PERCENTAGE,
};
use crate::data::{Verdict, VerificationResult};
use crate::errors::TriageError;
use crate::normalizer::normalize;
use crate::types::{CompetitorTitle, NormalizedPhrase};
use crate::utils::normalize_phrase;

/// Source of competitor product titles for a keyword.
///
/// Implementations own retries and rate limiting. An empty list and an `Err`
/// are treated the same by the pipeline.
pub trait TitleScraper: Send + Sync {
    /// Ordered, non-sponsored competitor titles for `keyword`.
    fn fetch_titles(&self, keyword: &str) -> Result<Vec<CompetitorTitle>, TriageError>;
}

/// Judges whether a keyword fits our product given competitor titles.
pub trait RelevanceClassifier: Send + Sync {
    fn classify(
        &self,
        request: &ClassificationRequest<'_>,
    ) -> Result<VerificationResult, TriageError>;
}

/// Fire-and-forget progress sink.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(u8, &str) + Send + Sync,
{
    fn report(&self, percent: u8, message: &str) {
        self(percent, message)
    }
}

/// Progress sink that drops every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

impl<T: TitleScraper + ?Sized> TitleScraper for Arc<T> {
    fn fetch_titles(&self, keyword: &str) -> Result<Vec<CompetitorTitle>, TriageError> {
        (**self).fetch_titles(keyword)
    }
}

impl<T: TitleScraper + ?Sized> TitleScraper for Box<T> {
    fn fetch_titles(&self, keyword: &str) -> Result<Vec<CompetitorTitle>, TriageError> {
        (**self).fetch_titles(keyword)
    }
}

impl<T: RelevanceClassifier + ?Sized> RelevanceClassifier for Arc<T> {
    fn classify(
        &self,
        request: &ClassificationRequest<'_>,
    ) -> Result<VerificationResult, TriageError> {
        (**self).classify(request)
    }
}

impl<T: RelevanceClassifier + ?Sized> RelevanceClassifier for Box<T> {
    fn classify(
        &self,
        request: &ClassificationRequest<'_>,
    ) -> Result<VerificationResult, TriageError> {
        (**self).classify(request)
    }
}

/// Our product as shown to the classifier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductListing {
    pub title: String,
    pub bullets: Vec<String>,
}

impl ProductListing {
    pub fn new(title: impl Into<String>, bullets: Vec<String>) -> Self {
        Self {
            title: title.into(),
            bullets,
        }
    }
}

/// Everything a classifier sees for one keyword.
#[derive(Clone, Copy, Debug)]
pub struct ClassificationRequest<'a> {
    pub keyword: &'a str,
    pub product: &'a ProductListing,
    /// Already truncated to the pipeline's title limit, scraper order kept.
    pub competitor_titles: &'a [CompetitorTitle],
}

/// Scraper backed by a fixed keyword -> titles table.
///
/// Lookups use the normalized keyword; unknown keywords yield no titles.
#[derive(Clone, Debug, Default)]
pub struct InMemoryScraper {
    titles: HashMap<NormalizedPhrase, Vec<CompetitorTitle>>,
}

impl InMemoryScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_titles<I, T>(mut self, keyword: &str, titles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CompetitorTitle>,
    {
        self.insert(keyword, titles);
        self
    }

    pub fn insert<I, T>(&mut self, keyword: &str, titles: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<CompetitorTitle>,
    {
        self.titles.insert(
            normalize_phrase(keyword),
            titles.into_iter().map(Into::into).collect(),
        );
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl FromIterator<(String, Vec<CompetitorTitle>)> for InMemoryScraper {
    fn from_iter<I: IntoIterator<Item = (String, Vec<CompetitorTitle>)>>(iter: I) -> Self {
        let mut scraper = Self::new();
        for (keyword, titles) in iter {
            scraper.insert(&keyword, titles);
        }
        scraper
    }
}

impl TitleScraper for InMemoryScraper {
    fn fetch_titles(&self, keyword: &str) -> Result<Vec<CompetitorTitle>, TriageError> {
        Ok(self
            .titles
            .get(&normalize_phrase(keyword))
            .cloned()
            .unwrap_or_default())
    }
}

/// Rules-based classifier comparing content tokens of competitor titles
/// against our title and bullets.
#[derive(Clone, Debug)]
pub struct TitleOverlapClassifier {
    min_shared_tokens: usize,
    relevant_match_percentage: u8,
}

impl Default for TitleOverlapClassifier {
    fn default() -> Self {
        Self {
            min_shared_tokens: DEFAULT_MIN_SHARED_TOKENS,
            relevant_match_percentage: DEFAULT_RELEVANT_MATCH_PERCENTAGE,
        }
    }
}

impl TitleOverlapClassifier {
    pub fn new(min_shared_tokens: usize, relevant_match_percentage: u8) -> Self {
        Self {
            min_shared_tokens: min_shared_tokens.max(1),
            relevant_match_percentage: relevant_match_percentage.min(100),
        }
    }
}

impl RelevanceClassifier for TitleOverlapClassifier {
    fn classify(
        &self,
        request: &ClassificationRequest<'_>,
    ) -> Result<VerificationResult, TriageError> {
        let total = request.competitor_titles.len();
        if total == 0 {
            return Err(TriageError::ClassifierFailed {
                keyword: request.keyword.to_string(),
                reason: "no competitor titles to compare".into(),
            });
        }

        let product_tokens: HashSet<String> = std::iter::once(&request.product.title)
            .chain(request.product.bullets.iter())
            .flat_map(|text| normalize(text))
            .collect();

        let matches = request
            .competitor_titles
            .iter()
            .filter(|title| {
                let shared = normalize(title)
                    .into_iter()
                    .collect::<HashSet<_>>()
                    .intersection(&product_tokens)
                    .count();
                shared >= self.min_shared_tokens
            })
            .count();

        let match_percentage = (matches * 100 / total) as u8;
        let verdict = if match_percentage >= self.relevant_match_percentage {
            Verdict::Relevant
        } else {
            Verdict::Irrelevant
        };
        debug!(
            keyword = request.keyword,
            matches,
            titles = total,
            match_percentage,
            "overlap classification"
        );
        Ok(VerificationResult::new(
            verdict,
            match_percentage,
            format!("{matches} of {total} competitor titles match our product"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> ProductListing {
        ProductListing::new(
            "Freeze Dried Strawberry Slices",
            vec!["Crunchy organic fruit snack".into()],
        )
    }

    #[test]
    fn in_memory_scraper_normalizes_lookups() {
        let scraper = InMemoryScraper::new().with_titles("Freeze Dried  Mango", ["A", "B"]);
        assert_eq!(
            scraper.fetch_titles("freeze dried mango").unwrap(),
            vec!["A".to_string(), "B".to_string()]
        );
        assert!(scraper.fetch_titles("unknown").unwrap().is_empty());
        assert_eq!(scraper.len(), 1);
    }

    #[test]
    fn overlap_classifier_counts_matching_titles() {
        let product = listing();
        let titles = vec![
            "Organic Freeze Dried Strawberries".to_string(),
            "Strawberry Fruit Snack Bites".to_string(),
            "Dog Chew Toy".to_string(),
            "Freeze Dried Mango".to_string(),
        ];
        let request = ClassificationRequest {
            keyword: "freeze dried strawberries",
            product: &product,
            competitor_titles: &titles,
        };
        let result = TitleOverlapClassifier::default().classify(&request).unwrap();
        // "freeze dried mango" shares freeze + dried.
        assert_eq!(result.match_percentage, 75);
        assert_eq!(result.verdict, Verdict::Relevant);
        assert_eq!(result.reasoning, "3 of 4 competitor titles match our product");
    }

    #[test]
    fn overlap_classifier_below_threshold_is_irrelevant() {
        let product = listing();
        let titles = vec!["Dog Chew Toy".to_string(), "Strawberry Candle".to_string()];
        let request = ClassificationRequest {
            keyword: "strawberry candle",
            product: &product,
            competitor_titles: &titles,
        };
        let result = TitleOverlapClassifier::default().classify(&request).unwrap();
        assert_eq!(result.verdict, Verdict::Irrelevant);
        assert_eq!(result.match_percentage, 0);
    }

    #[test]
    fn overlap_classifier_rejects_empty_titles() {
        let product = listing();
        let request = ClassificationRequest {
            keyword: "anything",
            product: &product,
            competitor_titles: &[],
        };
        assert!(matches!(
            TitleOverlapClassifier::default().classify(&request),
            Err(TriageError::ClassifierFailed { .. })
        ));
    }

    #[test]
    fn closures_are_progress_sinks() {
        let seen = std::sync::Mutex::new(Vec::new());
        let sink = |percent: u8, message: &str| {
            seen.lock().unwrap().push((percent, message.to_string()));
        };
        sink.report(96, "Verifying keywords: 1/4");
        NoProgress.report(99, "ignored");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
