use async_trait::async_trait;
use jobsearch_core::{Candidate, JobSearchResult, Layer, SearchFilters, SearchQuery};
use std::sync::Arc;

use super::{candidate, LayerMatcher};
use crate::config::PipelineConfig;
use crate::store::JobCorpus;

/// L1: exact title/company equality, then prefix matches.
pub struct ExactPrefixMatcher {
    corpus: Arc<dyn JobCorpus>,
    exact_score: f32,
    prefix_score: f32,
}

impl ExactPrefixMatcher {
    /// Matcher over `corpus` using the L1 scores of `config`.
    pub fn new(corpus: Arc<dyn JobCorpus>, config: &PipelineConfig) -> Self {
        Self {
            corpus,
            exact_score: config.exact_score,
            prefix_score: config.prefix_score,
        }
    }
}

#[async_trait]
impl LayerMatcher for ExactPrefixMatcher {
    fn layer(&self) -> Layer {
        Layer::L1
    }

    async fn find_candidates(
        &self,
        query: &SearchQuery,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<Candidate>> {
        let text = query.text();
        let exact = self.corpus.exact_matches(text, filters, limit).await?;
        let mut candidates: Vec<Candidate> = exact
            .iter()
            .map(|hit| candidate(hit, Layer::L1, self.exact_score))
            .collect();

        let remaining = limit.saturating_sub(candidates.len());
        if remaining > 0 {
            let prefix = self.corpus.prefix_matches(text, filters, remaining).await?;
            candidates.extend(
                prefix
                    .iter()
                    .filter(|hit| !exact.iter().any(|e| e.job_id == hit.job_id))
                    .map(|hit| candidate(hit, Layer::L1, self.prefix_score)),
            );
        }
        Ok(candidates)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::layers::test_support::{corpus, query};

    #[tokio::test]
    async fn test_exact_scores_above_prefix() {
        let corpus = corpus().await;
        let matcher = ExactPrefixMatcher::new(corpus, &PipelineConfig::default());
        let found = matcher
            .find_candidates(&query("Software Engineer"), &SearchFilters::default(), 10)
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].raw_score, 1.0);
        assert_eq!(found[1].raw_score, 0.9);
        assert!(found.iter().all(|c| c.source_layer == Layer::L1));
    }

    #[tokio::test]
    async fn test_limit_applies_across_exact_and_prefix() {
        let corpus = corpus().await;
        let matcher = ExactPrefixMatcher::new(corpus, &PipelineConfig::default());
        let found = matcher
            .find_candidates(&query("software engineer"), &SearchFilters::default(), 1)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw_score, 1.0);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let corpus = corpus().await;
        let matcher = ExactPrefixMatcher::new(corpus, &PipelineConfig::default());
        let found = matcher
            .find_candidates(&query("sofware enginer"), &SearchFilters::default(), 10)
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
