use std::collections::HashSet;

use tracing::{debug, info};

use crate::constants::verification::{VERIFIED_IRRELEVANT_PREFIX, VERIFIED_RELEVANT_PREFIX};
use crate::data::{Category, KeywordRecord, Verdict};
use crate::types::NormalizedPhrase;

use super::VerificationResults;

/// Normalized phrases of records whose category is in `candidates`, first occurrence kept.
pub fn select_for_verification(
    records: &[KeywordRecord],
    candidates: &[Category],
) -> Vec<NormalizedPhrase> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for record in records {
        if candidates.contains(&record.category) && seen.insert(record.normalized_phrase.as_str()) {
            selected.push(record.normalized_phrase.clone());
        }
    }
    selected
}

/// Write verification verdicts back into `records`.
///
/// Records are matched on normalized phrase. `design_specific` records are
/// never changed. Returns how many records were set to relevant.
pub fn apply_results(records: &mut [KeywordRecord], results: &VerificationResults) -> usize {
    let mut relevant = 0;
    let mut updated = 0;
    for record in records.iter_mut() {
        let Some(result) = results.get(&record.normalized_phrase) else {
            continue;
        };
        if record.category == Category::DesignSpecific {
            debug!(keyword = %record.phrase, "design-specific keyword kept despite verification");
            continue;
        }
        match result.verdict {
            Verdict::Relevant => {
                record.set_category(
                    Category::Relevant,
                    format!("{VERIFIED_RELEVANT_PREFIX}: {}", result.reasoning),
                );
                relevant += 1;
            }
            Verdict::Irrelevant => {
                record.set_category(
                    Category::Irrelevant,
                    format!("{VERIFIED_IRRELEVANT_PREFIX}: {}", result.reasoning),
                );
            }
        }
        updated += 1;
    }
    info!(updated, relevant, "applied verification results");
    relevant
}
