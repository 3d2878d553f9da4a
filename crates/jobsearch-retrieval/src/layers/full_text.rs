use async_trait::async_trait;
use jobsearch_core::{Candidate, JobSearchResult, Layer, QueryType, SearchFilters, SearchQuery};
use std::sync::Arc;

use super::{candidate, LayerMatcher};
use crate::config::PipelineConfig;
use crate::store::JobCorpus;

/// L2: full-text relevance, rescaled so the best hit scores `full_text_max`.
pub struct FullTextMatcher {
    corpus: Arc<dyn JobCorpus>,
    max_score: f32,
    min_score: f32,
}

impl FullTextMatcher {
    /// Matcher over `corpus` using the L2 settings of `config`.
    pub fn new(corpus: Arc<dyn JobCorpus>, config: &PipelineConfig) -> Self {
        Self {
            corpus,
            max_score: config.full_text_max,
            min_score: config.min_layer_score,
        }
    }
}

#[async_trait]
impl LayerMatcher for FullTextMatcher {
    fn layer(&self) -> Layer {
        Layer::L2
    }

    async fn find_candidates(
        &self,
        query: &SearchQuery,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<Candidate>> {
        let phrase = query.query_type == QueryType::Phrase;
        let hits = self
            .corpus
            .full_text(query.text(), phrase, filters, limit)
            .await?;

        let top = hits.first().map_or(0.0, |h| h.score);
        if top <= 0.0 {
            return Ok(Vec::new());
        }
        Ok(hits
            .iter()
            .map(|hit| {
                let scaled = (hit.score / top * self.max_score).max(self.min_score);
                candidate(hit, Layer::L2, scaled)
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::layers::test_support::{corpus, query};

    #[tokio::test]
    async fn test_scores_within_band() {
        let corpus = corpus().await;
        let config = PipelineConfig::default();
        let matcher = FullTextMatcher::new(corpus, &config);
        let found = matcher
            .find_candidates(&query("software rust"), &SearchFilters::default(), 10)
            .await
            .unwrap();

        assert!(!found.is_empty());
        assert!((found[0].raw_score - config.full_text_max).abs() < 1e-6);
        for c in &found {
            assert!(c.raw_score >= config.min_layer_score && c.raw_score <= config.full_text_max);
        }
    }

    #[tokio::test]
    async fn test_phrase_query_matches_contiguously() {
        let corpus = corpus().await;
        let matcher = FullTextMatcher::new(corpus, &PipelineConfig::default());
        let found = matcher
            .find_candidates(&query("\"laminated dough\""), &SearchFilters::default(), 10)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let found = matcher
            .find_candidates(&query("\"dough laminated\""), &SearchFilters::default(), 10)
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
