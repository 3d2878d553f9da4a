use async_trait::async_trait;
use jobsearch_core::{
    Candidate, JobSearchError, JobSearchResult, Layer, SearchFilters, SearchQuery,
};
use std::sync::Arc;

use super::{candidate, LayerMatcher};
use crate::config::PipelineConfig;
use crate::store::JobCorpus;

/// L4: cosine similarity between the query embedding and job embeddings.
///
/// Skipped entirely when the request has no embedding.
pub struct SemanticMatcher {
    corpus: Arc<dyn JobCorpus>,
    max_score: f32,
    min_similarity: f32,
    min_score: f32,
}

impl SemanticMatcher {
    /// Matcher over `corpus` using the L4 settings of `config`.
    pub fn new(corpus: Arc<dyn JobCorpus>, config: &PipelineConfig) -> Self {
        Self {
            corpus,
            max_score: config.semantic_max,
            min_similarity: config.semantic_min_similarity,
            min_score: config.min_layer_score,
        }
    }
}

#[async_trait]
impl LayerMatcher for SemanticMatcher {
    fn layer(&self) -> Layer {
        Layer::L4
    }

    fn applies_to(&self, query: &SearchQuery) -> bool {
        query.embedding.is_some()
    }

    fn needs_embedding(&self) -> bool {
        true
    }

    async fn find_candidates(
        &self,
        query: &SearchQuery,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<Candidate>> {
        let embedding = query
            .embedding
            .as_deref()
            .ok_or_else(|| JobSearchError::unavailable("embedder", "no query embedding"))?;
        let hits = self.corpus.nearest(embedding, filters, limit).await?;
        Ok(hits
            .iter()
            .filter(|hit| hit.score >= self.min_similarity)
            .map(|hit| {
                let scaled = (hit.score.min(1.0) * self.max_score).max(self.min_score);
                candidate(hit, Layer::L4, scaled)
            })
            .collect())
    }
}
