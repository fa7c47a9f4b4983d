//! Concurrent keyword verification against competitor listings.
//!
//! Each keyword is scraped for competitor titles and then classified. The two
//! steps draw on separate bounded pools ([`ScrapePool`], [`VerifyPool`]) so a
//! slow classifier never throttles scraping and vice versa. A batch always
//! completes: per-keyword failures become conservative irrelevant results.

mod apply;
mod collaborators;
mod pool;
mod task;

pub use apply::{apply_results, select_for_verification};
pub use collaborators::{
    ClassificationRequest, InMemoryScraper, NoProgress, ProductListing, ProgressSink,
    RelevanceClassifier, TitleOverlapClassifier, TitleScraper,
};
pub use pool::{ScrapePool, SlotGuard, SlotPool, VerifyPool};
pub use task::{TaskState, VerificationTask};

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::{ProgressRange, VerificationConfig};
use crate::constants::verification::MAX_COMPETITOR_TITLES;
use crate::data::{Verdict, VerificationResult};
use crate::errors::TriageError;
use crate::types::{CompetitorTitle, NormalizedPhrase};
use crate::utils::normalize_phrase;

/// Verification outcome per normalized keyword, in completion order.
pub type VerificationResults = IndexMap<NormalizedPhrase, VerificationResult>;

/// Cumulative pipeline counters across every `verify` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Keywords that reached a classifier verdict.
    pub verified: usize,
    /// Verdicts that came back relevant.
    pub relevant: usize,
    /// Keywords whose scrape returned nothing.
    pub no_titles: usize,
    /// Keywords whose scrape returned an error.
    pub scrape_failures: usize,
    /// Keywords whose classification returned an error.
    pub classifier_failures: usize,
}

#[derive(Default)]
struct PipelineCounters {
    verified: AtomicUsize,
    relevant: AtomicUsize,
    no_titles: AtomicUsize,
    scrape_failures: AtomicUsize,
    classifier_failures: AtomicUsize,
}

/// Scraped task waiting for a classifier slot.
type ScrapedTask = (VerificationTask, Vec<CompetitorTitle>);

pub struct VerificationPipeline<S, C> {
    scraper: S,
    classifier: C,
    scrape_pool: Arc<ScrapePool>,
    verify_pool: Arc<VerifyPool>,
    max_competitor_titles: usize,
    progress: ProgressRange,
    counters: PipelineCounters,
}

impl<S, C> VerificationPipeline<S, C>
where
    S: TitleScraper,
    C: RelevanceClassifier,
{
    /// Build a pipeline over injected pools.
    ///
    /// Pool capacities fix both the concurrency bound and the number of
    /// workers spawned per stage.
    pub fn new(
        scraper: S,
        classifier: C,
        scrape_pool: Arc<ScrapePool>,
        verify_pool: Arc<VerifyPool>,
    ) -> Self {
        Self {
            scraper,
            classifier,
            scrape_pool,
            verify_pool,
            max_competitor_titles: MAX_COMPETITOR_TITLES,
            progress: ProgressRange::default(),
            counters: PipelineCounters::default(),
        }
    }

    /// Build a pipeline with fresh pools of the given sizes.
    pub fn with_concurrency(
        scraper: S,
        classifier: C,
        scrape_concurrency: usize,
        verify_concurrency: usize,
    ) -> Result<Self, TriageError> {
        Ok(Self::new(
            scraper,
            classifier,
            Arc::new(ScrapePool::new(scrape_concurrency)?),
            Arc::new(VerifyPool::new(verify_concurrency)?),
        ))
    }

    /// Build a pipeline from configuration (pool sizes, title limit, progress range).
    pub fn from_config(
        scraper: S,
        classifier: C,
        config: &VerificationConfig,
    ) -> Result<Self, TriageError> {
        Ok(Self::with_concurrency(
            scraper,
            classifier,
            config.scrape_concurrency,
            config.verify_concurrency,
        )?
        .with_max_competitor_titles(config.max_competitor_titles)
        .with_progress_range(config.progress))
    }

    pub fn with_max_competitor_titles(mut self, max: usize) -> Self {
        self.max_competitor_titles = max.max(1);
        self
    }

    pub fn with_progress_range(mut self, progress: ProgressRange) -> Self {
        self.progress = progress;
        self
    }

    pub fn scrape_pool(&self) -> &ScrapePool {
        &self.scrape_pool
    }

    pub fn verify_pool(&self) -> &VerifyPool {
        &self.verify_pool
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            verified: self.counters.verified.load(Ordering::Relaxed),
            relevant: self.counters.relevant.load(Ordering::Relaxed),
            no_titles: self.counters.no_titles.load(Ordering::Relaxed),
            scrape_failures: self.counters.scrape_failures.load(Ordering::Relaxed),
            classifier_failures: self.counters.classifier_failures.load(Ordering::Relaxed),
        }
    }

    /// Verify every keyword and return one result per distinct normalized keyword.
    ///
    /// Blocks until all tasks are terminal. Results are keyed by normalized
    /// phrase in completion order; blank keywords are skipped.
    pub fn verify<K: AsRef<str>>(
        &self,
        keywords: &[K],
        product: &ProductListing,
        progress: &dyn ProgressSink,
    ) -> VerificationResults {
        let keywords = dedup_keywords(keywords);
        if keywords.is_empty() {
            info!("no keywords submitted for verification");
            return VerificationResults::new();
        }

        let total = keywords.len();
        let scrape_workers = self.scrape_pool.slots().capacity().min(total);
        let verify_workers = self.verify_pool.slots().capacity().min(total);
        info!(
            keywords = total,
            scrape_workers, verify_workers, "starting keyword verification"
        );

        let completion = Completion {
            results: Mutex::new(VerificationResults::with_capacity(total)),
            completed: AtomicUsize::new(0),
            total,
            range: self.progress,
            sink: progress,
        };
        let next_keyword = AtomicUsize::new(0);
        let (sender, receiver) = mpsc::channel::<ScrapedTask>();
        let receiver = Mutex::new(receiver);

        thread::scope(|scope| {
            for _ in 0..scrape_workers {
                let sender = sender.clone();
                let (keywords, next_keyword, completion) =
                    (&keywords, &next_keyword, &completion);
                scope.spawn(move || {
                    self.scrape_stage(keywords, next_keyword, sender, completion)
                });
            }
            // Verify workers exit once every scrape worker has dropped its sender.
            drop(sender);
            for _ in 0..verify_workers {
                let (receiver, completion) = (&receiver, &completion);
                scope.spawn(move || self.verify_stage(product, receiver, completion));
            }
        });

        let results = completion
            .results
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let relevant = results
            .values()
            .filter(|result| result.verdict == Verdict::Relevant)
            .count();
        info!(
            keywords = total,
            relevant,
            irrelevant = results.len() - relevant,
            "keyword verification complete"
        );
        results
    }

    fn scrape_stage(
        &self,
        keywords: &[NormalizedPhrase],
        next_keyword: &AtomicUsize,
        sender: Sender<ScrapedTask>,
        completion: &Completion<'_>,
    ) {
        loop {
            let idx = next_keyword.fetch_add(1, Ordering::Relaxed);
            let Some(keyword) = keywords.get(idx) else {
                return;
            };
            let mut task = VerificationTask::new(keyword.clone());
            transition(&mut task, TaskState::Scraping);

            let scraped = {
                let _slot = self.scrape_pool.slots().acquire();
                self.scraper.fetch_titles(keyword)
            };

            match scraped {
                Ok(mut titles) if !titles.is_empty() => {
                    debug!(keyword = %keyword, titles = titles.len(), "scraped competitor titles");
                    titles.truncate(self.max_competitor_titles);
                    transition(&mut task, TaskState::Scraped);
                    if let Err(mpsc::SendError((task, _))) = sender.send((task, titles)) {
                        // Only reachable if every verify worker is gone.
                        self.counters
                            .classifier_failures
                            .fetch_add(1, Ordering::Relaxed);
                        completion.finish(
                            task,
                            TaskState::Failed,
                            VerificationResult::classifier_error("verify stage stopped"),
                        );
                    }
                }
                Ok(_) => {
                    debug!(keyword = %keyword, "no competitor titles found");
                    self.counters.no_titles.fetch_add(1, Ordering::Relaxed);
                    completion.finish(task, TaskState::Failed, VerificationResult::no_titles());
                }
                Err(err) => {
                    warn!(keyword = %keyword, error = %err, "scrape failed; marking irrelevant");
                    self.counters.scrape_failures.fetch_add(1, Ordering::Relaxed);
                    completion.finish(task, TaskState::Failed, VerificationResult::no_titles());
                }
            }
        }
    }

    fn verify_stage(
        &self,
        product: &ProductListing,
        receiver: &Mutex<Receiver<ScrapedTask>>,
        completion: &Completion<'_>,
    ) {
        loop {
            let next = receiver
                .lock()
                .expect("verification queue poisoned")
                .recv();
            let Ok((mut task, titles)) = next else {
                return;
            };
            transition(&mut task, TaskState::Verifying);

            let request = ClassificationRequest {
                keyword: task.keyword(),
                product,
                competitor_titles: &titles,
            };
            let classified = {
                let _slot = self.verify_pool.slots().acquire();
                self.classifier.classify(&request)
            };

            match classified {
                Ok(result) => {
                    debug!(
                        keyword = %task.keyword(),
                        verdict = ?result.verdict,
                        match_percentage = result.match_percentage,
                        "keyword classified"
                    );
                    self.counters.verified.fetch_add(1, Ordering::Relaxed);
                    if result.verdict == Verdict::Relevant {
                        self.counters.relevant.fetch_add(1, Ordering::Relaxed);
                    }
                    let result = VerificationResult::new(
                        result.verdict,
                        result.match_percentage,
                        result.reasoning,
                    );
                    completion.finish(task, TaskState::Done, result);
                }
                Err(err) => {
                    warn!(
                        keyword = %task.keyword(),
                        error = %err,
                        "classification failed; marking irrelevant"
                    );
                    self.counters
                        .classifier_failures
                        .fetch_add(1, Ordering::Relaxed);
                    completion.finish(
                        task,
                        TaskState::Failed,
                        VerificationResult::classifier_error(err),
                    );
                }
            }
        }
    }
}

/// Shared sink for terminal tasks: results map plus progress counter.
struct Completion<'a> {
    results: Mutex<VerificationResults>,
    completed: AtomicUsize,
    total: usize,
    range: ProgressRange,
    sink: &'a dyn ProgressSink,
}

impl Completion<'_> {
    fn finish(&self, mut task: VerificationTask, terminal: TaskState, result: VerificationResult) {
        if let Err(err) = task.finish(terminal, result.clone()) {
            warn!(error = %err, "unexpected task transition");
        }
        let keyword = task.keyword().to_string();
        // Progress is reported under the results lock so percentages never go backwards.
        let mut results = self.results.lock().expect("verification results poisoned");
        results.insert(keyword, result);
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        let percent = self.range.percent(completed, self.total);
        self.sink.report(
            percent,
            &format!("Verifying keywords: {completed}/{}", self.total),
        );
    }
}

fn transition(task: &mut VerificationTask, next: TaskState) {
    if let Err(err) = task.advance(next) {
        warn!(error = %err, "unexpected task transition");
    }
}

/// Normalize, drop blanks, and keep the first occurrence of each keyword.
fn dedup_keywords<K: AsRef<str>>(keywords: &[K]) -> Vec<NormalizedPhrase> {
    let mut seen = HashSet::with_capacity(keywords.len());
    let mut unique = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let normalized = normalize_phrase(keyword.as_ref());
        if normalized.is_empty() {
            debug!("skipping blank keyword");
            continue;
        }
        if seen.insert(normalized.clone()) {
            unique.push(normalized);
        }
    }
    unique
}
