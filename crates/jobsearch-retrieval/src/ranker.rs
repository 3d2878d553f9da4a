//! Merge layer batches into one deduplicated, totally ordered result list.

use jobsearch_core::{Candidate, JobSearchError, JobSearchResult, RankedResult};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

/// Collapse candidates to one entry per job.
///
/// The combined score is the best raw score across layers plus
/// `corroboration_bonus` for every additional layer that found the job.
/// Output is ordered by combined score, then newest first, then id.
pub fn merge<'a, I>(candidates: I, corroboration_bonus: f32) -> Vec<RankedResult>
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let mut merged: HashMap<Uuid, (f32, RankedResult)> = HashMap::new();
    for c in candidates {
        let entry = merged.entry(c.job_id).or_insert_with(|| {
            (
                c.raw_score,
                RankedResult {
                    job_id: c.job_id,
                    combined_score: c.raw_score,
                    matched_layers: BTreeSet::new(),
                    posted_at: c.posted_at,
                },
            )
        });
        entry.0 = entry.0.max(c.raw_score);
        entry.1.matched_layers.insert(c.source_layer);
    }

    let mut results: Vec<RankedResult> = merged
        .into_values()
        .map(|(best, mut result)| {
            let extra_layers = result.matched_layers.len().saturating_sub(1) as f32;
            result.combined_score = best + corroboration_bonus * extra_layers;
            result
        })
        .collect();
    results.sort_by(compare);
    results
}

/// The total order results are returned in.
pub fn compare(a: &RankedResult, b: &RankedResult) -> Ordering {
    b.combined_score
        .total_cmp(&a.combined_score)
        .then_with(|| b.posted_at.cmp(&a.posted_at))
        .then_with(|| a.job_id.cmp(&b.job_id))
}

/// Verify the merged list is duplicate-free, finite and sorted.
///
/// A violation is a programming fault and surfaces as [`JobSearchError::Pipeline`].
pub fn check_invariants(results: &[RankedResult]) -> JobSearchResult<()> {
    let mut seen = HashSet::with_capacity(results.len());
    for r in results {
        if !seen.insert(r.job_id) {
            return Err(JobSearchError::Pipeline(format!(
                "job {} appears more than once",
                r.job_id
            )));
        }
        if !r.combined_score.is_finite() {
            return Err(JobSearchError::Pipeline(format!(
                "job {} has a non-finite score",
                r.job_id
            )));
        }
        if r.matched_layers.is_empty() {
            return Err(JobSearchError::Pipeline(format!(
                "job {} has no matched layer",
                r.job_id
            )));
        }
    }
    if results
        .windows(2)
        .any(|w| compare(&w[0], &w[1]) == Ordering::Greater)
    {
        return Err(JobSearchError::Pipeline("results are not sorted".into()));
    }
    Ok(())
}
