use async_trait::async_trait;
use jobsearch_core::{Candidate, JobSearchResult, Layer, SearchFilters, SearchQuery};
use std::sync::Arc;

use super::{candidate, LayerMatcher};
use crate::config::PipelineConfig;
use crate::store::JobCorpus;

/// L3: trigram similarity on title and company, rejecting weak matches.
pub struct FuzzyMatcher {
    corpus: Arc<dyn JobCorpus>,
    min_similarity: f32,
    min_score: f32,
}

impl FuzzyMatcher {
    /// Matcher over `corpus` using the L3 cutoff of `config`.
    pub fn new(corpus: Arc<dyn JobCorpus>, config: &PipelineConfig) -> Self {
        Self {
            corpus,
            min_similarity: config.fuzzy_min_similarity,
            min_score: config.min_layer_score,
        }
    }
}

#[async_trait]
impl LayerMatcher for FuzzyMatcher {
    fn layer(&self) -> Layer {
        Layer::L3
    }

    async fn find_candidates(
        &self,
        query: &SearchQuery,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<Candidate>> {
        let hits = self
            .corpus
            .fuzzy(query.text(), self.min_similarity, filters, limit)
            .await?;
        Ok(hits
            .iter()
            .filter(|hit| hit.score >= self.min_similarity)
            .map(|hit| candidate(hit, Layer::L3, hit.score.max(self.min_score)))
            .collect())
    }
}
