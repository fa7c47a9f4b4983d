use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use keyword_triage::verification::{InMemoryScraper, NoProgress, apply_results};
use keyword_triage::{
    Category, ClassificationRequest, KeywordRecord, ProductListing, ProgressRange,
    RelevanceClassifier, ScrapePool, TitleScraper, TriageError, Verdict, VerificationPipeline,
    VerificationResult, VerifyPool,
};

#[derive(Default)]
struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct ScriptedScraper {
    titles: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    delay: Duration,
    probe: ConcurrencyProbe,
    calls: AtomicUsize,
}

impl TitleScraper for ScriptedScraper {
    fn fetch_titles(&self, keyword: &str) -> Result<Vec<String>, TriageError> {
        self.probe.enter();
        thread::sleep(self.delay);
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = if self.failing.contains(keyword) {
            Err(TriageError::ScrapeFailed {
                keyword: keyword.to_string(),
                reason: "blocked".into(),
            })
        } else {
            Ok(self.titles.get(keyword).cloned().unwrap_or_default())
        };
        self.probe.exit();
        outcome
    }
}

#[derive(Default)]
struct ScriptedClassifier {
    failing: HashSet<String>,
    delay: Duration,
    probe: ConcurrencyProbe,
    seen_titles: Mutex<HashMap<String, Vec<String>>>,
}

impl RelevanceClassifier for ScriptedClassifier {
    fn classify(
        &self,
        request: &ClassificationRequest<'_>,
    ) -> Result<VerificationResult, TriageError> {
        self.probe.enter();
        thread::sleep(self.delay);
        self.seen_titles.lock().unwrap().insert(
            request.keyword.to_string(),
            request.competitor_titles.to_vec(),
        );
        let outcome = if self.failing.contains(request.keyword) {
            Err(TriageError::ClassifierFailed {
                keyword: request.keyword.to_string(),
                reason: "timeout".into(),
            })
        } else {
            Ok(VerificationResult::new(Verdict::Relevant, 70, "scripted"))
        };
        self.probe.exit();
        outcome
    }
}

fn product() -> ProductListing {
    ProductListing::new(
        "Freeze Dried Strawberry Slices",
        vec!["Crunchy organic fruit snack".into()],
    )
}

/// Twenty keywords cycling through: no titles, scrape error, classifier error, success.
fn mixed_workload() -> (Vec<String>, Arc<ScriptedScraper>, Arc<ScriptedClassifier>) {
    let keywords: Vec<String> = (0..20).map(|idx| format!("kw-{idx:02}")).collect();
    let mut scraper = ScriptedScraper {
        delay: Duration::from_millis(2),
        ..ScriptedScraper::default()
    };
    let mut classifier = ScriptedClassifier {
        delay: Duration::from_millis(2),
        ..ScriptedClassifier::default()
    };
    for (idx, keyword) in keywords.iter().enumerate() {
        match idx % 4 {
            0 => {}
            1 => {
                scraper.failing.insert(keyword.clone());
            }
            2 => {
                scraper
                    .titles
                    .insert(keyword.clone(), vec![format!("{keyword} title")]);
                classifier.failing.insert(keyword.clone());
            }
            _ => {
                scraper
                    .titles
                    .insert(keyword.clone(), vec![format!("{keyword} title")]);
            }
        }
    }
    (keywords, Arc::new(scraper), Arc::new(classifier))
}

#[test]
fn every_keyword_gets_a_result_for_any_pool_sizes() {
    for (scrape, verify) in [(1, 1), (1, 4), (3, 2), (5, 5), (8, 1)] {
        let (keywords, scraper, classifier) = mixed_workload();
        let pipeline = VerificationPipeline::with_concurrency(
            Arc::clone(&scraper),
            Arc::clone(&classifier),
            scrape,
            verify,
        )
        .unwrap();
        let results = pipeline.verify(&keywords, &product(), &NoProgress);

        assert_eq!(results.len(), keywords.len(), "pools {scrape}/{verify}");
        for (idx, keyword) in keywords.iter().enumerate() {
            let result = &results[keyword.as_str()];
            match idx % 4 {
                0 | 1 => assert_eq!(*result, VerificationResult::no_titles()),
                2 => {
                    assert_eq!(result.verdict, Verdict::Irrelevant);
                    assert_eq!(result.match_percentage, 0);
                    assert_eq!(
                        result.reasoning,
                        format!("verification error: classifying '{keyword}' failed: timeout")
                    );
                }
                _ => {
                    assert_eq!(result.verdict, Verdict::Relevant);
                    assert_eq!(result.match_percentage, 70);
                }
            }
        }

        let stats = pipeline.stats();
        assert_eq!(stats.no_titles, 5);
        assert_eq!(stats.scrape_failures, 5);
        assert_eq!(stats.classifier_failures, 5);
        assert_eq!(stats.verified, 5);
        assert_eq!(scraper.calls.load(Ordering::SeqCst), 20);
    }
}

#[test]
fn pools_bound_concurrent_calls() {
    for (scrape, verify) in [(1, 1), (2, 3), (4, 2)] {
        let (keywords, scraper, classifier) = mixed_workload();
        let pipeline = VerificationPipeline::with_concurrency(
            Arc::clone(&scraper),
            Arc::clone(&classifier),
            scrape,
            verify,
        )
        .unwrap();
        pipeline.verify(&keywords, &product(), &NoProgress);

        assert!(scraper.probe.peak() <= scrape);
        assert!(classifier.probe.peak() <= verify);
        assert!(pipeline.scrape_pool().slots().peak_in_use() <= scrape);
        assert!(pipeline.verify_pool().slots().peak_in_use() <= verify);
        assert_eq!(pipeline.scrape_pool().slots().in_use(), 0);
        assert_eq!(pipeline.verify_pool().slots().in_use(), 0);
    }
}

struct SignallingScraper {
    second_started: Arc<AtomicBool>,
}

impl TitleScraper for SignallingScraper {
    fn fetch_titles(&self, keyword: &str) -> Result<Vec<String>, TriageError> {
        if keyword == "b" {
            self.second_started.store(true, Ordering::SeqCst);
        }
        Ok(vec![format!("{keyword} competitor")])
    }
}

struct WaitingClassifier {
    second_started: Arc<AtomicBool>,
}

impl RelevanceClassifier for WaitingClassifier {
    fn classify(
        &self,
        request: &ClassificationRequest<'_>,
    ) -> Result<VerificationResult, TriageError> {
        if request.keyword != "a" {
            return Ok(VerificationResult::new(Verdict::Relevant, 100, "plain"));
        }
        let deadline = Instant::now() + Duration::from_secs(5);
        while !self.second_started.load(Ordering::SeqCst) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        let reasoning = if self.second_started.load(Ordering::SeqCst) {
            "overlapped"
        } else {
            "serialized"
        };
        Ok(VerificationResult::new(Verdict::Relevant, 100, reasoning))
    }
}

#[test]
fn next_keyword_scrapes_while_previous_is_classified() {
    let second_started = Arc::new(AtomicBool::new(false));
    let pipeline = VerificationPipeline::with_concurrency(
        SignallingScraper {
            second_started: Arc::clone(&second_started),
        },
        WaitingClassifier {
            second_started: Arc::clone(&second_started),
        },
        1,
        1,
    )
    .unwrap();
    let results = pipeline.verify(&["a", "b"], &product(), &NoProgress);
    assert_eq!(results["a"].reasoning, "overlapped");
    assert_eq!(results["b"].reasoning, "plain");
}

#[test]
fn empty_scrape_yields_no_titles_result() {
    let pipeline = VerificationPipeline::with_concurrency(
        InMemoryScraper::new(),
        ScriptedClassifier::default(),
        2,
        2,
    )
    .unwrap();
    let results = pipeline.verify(&["zzz-nomatch"], &product(), &NoProgress);
    let result = &results["zzz-nomatch"];
    assert_eq!(result.verdict, Verdict::Irrelevant);
    assert_eq!(result.match_percentage, 0);
    assert_eq!(result.reasoning, "no competitor titles found");
}

#[test]
fn classifier_sees_first_eight_titles_in_scraper_order() {
    let titles: Vec<String> = (0..12).map(|idx| format!("t{idx}")).collect();
    let classifier = Arc::new(ScriptedClassifier::default());
    let pipeline = VerificationPipeline::with_concurrency(
        InMemoryScraper::new().with_titles("mango", titles.clone()),
        Arc::clone(&classifier),
        1,
        1,
    )
    .unwrap();
    pipeline.verify(&["mango"], &product(), &NoProgress);
    let seen = classifier.seen_titles.lock().unwrap();
    assert_eq!(seen["mango"], titles[..8].to_vec());
}

#[test]
fn progress_advances_to_the_top_of_its_range() {
    let keywords: Vec<String> = (0..10).map(|idx| format!("kw-{idx}")).collect();
    let pipeline = VerificationPipeline::with_concurrency(
        InMemoryScraper::new(),
        ScriptedClassifier::default(),
        3,
        2,
    )
    .unwrap();
    let updates = Mutex::new(Vec::new());
    let sink = |percent: u8, message: &str| {
        updates.lock().unwrap().push((percent, message.to_string()));
    };
    pipeline.verify(&keywords, &product(), &sink);

    let updates = updates.into_inner().unwrap();
    assert_eq!(updates.len(), 10);
    assert!(updates.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    assert!(updates.iter().all(|(percent, _)| (95..=99).contains(percent)));
    assert_eq!(
        updates.last().unwrap(),
        &(99, "Verifying keywords: 10/10".to_string())
    );
}

#[test]
fn progress_reports_into_a_custom_range() {
    let pipeline = VerificationPipeline::with_concurrency(
        InMemoryScraper::new(),
        ScriptedClassifier::default(),
        2,
        2,
    )
    .unwrap()
    .with_progress_range(ProgressRange {
        baseline: 10,
        span: 80,
    });
    let percents = Mutex::new(Vec::new());
    let sink = |percent: u8, _message: &str| percents.lock().unwrap().push(percent);
    pipeline.verify(&["a", "b", "c", "d"], &product(), &sink);
    assert_eq!(percents.into_inner().unwrap(), vec![30, 50, 70, 90]);
}

#[test]
fn pools_can_be_shared_between_pipelines() {
    let scrape_pool = Arc::new(ScrapePool::new(2).unwrap());
    let verify_pool = Arc::new(VerifyPool::new(1).unwrap());
    let scraper = InMemoryScraper::new()
        .with_titles("mango", ["Mango Chips"])
        .with_titles("kiwi", ["Kiwi Slices"]);

    let first = VerificationPipeline::new(
        scraper.clone(),
        ScriptedClassifier::default(),
        Arc::clone(&scrape_pool),
        Arc::clone(&verify_pool),
    );
    let second = VerificationPipeline::new(
        scraper,
        ScriptedClassifier::default(),
        Arc::clone(&scrape_pool),
        Arc::clone(&verify_pool),
    );
    first.verify(&["mango", "lime"], &product(), &NoProgress);
    second.verify(&["kiwi"], &product(), &NoProgress);

    assert_eq!(scrape_pool.slots().acquisitions(), 3);
    assert_eq!(verify_pool.slots().acquisitions(), 2);
}

#[test]
fn applying_results_keeps_design_specific_keywords() {
    let scraper = InMemoryScraper::new()
        .with_titles("mango slices", ["Dried Mango Slices"])
        .with_titles("mango candle", ["Mango Scented Candle"]);
    let pipeline =
        VerificationPipeline::with_concurrency(scraper, ScriptedClassifier::default(), 2, 2)
            .unwrap();
    let mut records = vec![
        KeywordRecord::new("Mango Slices", 300, Category::DesignSpecific).with_reasoning("curated"),
        KeywordRecord::new("mango candle", 40, Category::Irrelevant),
        KeywordRecord::new("mango tea", 10, Category::Irrelevant),
    ];
    let keywords: Vec<&str> = records.iter().map(|r| r.phrase.as_str()).collect();
    let results = pipeline.verify(&keywords, &product(), &NoProgress);
    assert_eq!(results.len(), 3);

    let relevant = apply_results(&mut records, &results);
    assert_eq!(relevant, 1);
    assert_eq!(records[0].category, Category::DesignSpecific);
    assert_eq!(records[0].reasoning, "curated");
    assert_eq!(records[1].category, Category::Relevant);
    assert_eq!(records[1].reasoning, "Verified as relevant: scripted");
    assert_eq!(records[2].category, Category::Irrelevant);
    assert_eq!(
        records[2].reasoning,
        "Verified as irrelevant: no competitor titles found"
    );
}
