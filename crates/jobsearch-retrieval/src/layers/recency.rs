use async_trait::async_trait;
use jobsearch_core::{Candidate, JobSearchResult, Layer, SearchFilters, SearchQuery};
use std::sync::Arc;

use super::{candidate, LayerMatcher};
use crate::config::PipelineConfig;
use crate::store::JobCorpus;

/// L6: newest filter-matching jobs at a fixed low score. The query is ignored.
pub struct RecencyMatcher {
    corpus: Arc<dyn JobCorpus>,
    score: f32,
}

impl RecencyMatcher {
    /// Matcher over `corpus` scoring every hit with `recency_score`.
    pub fn new(corpus: Arc<dyn JobCorpus>, config: &PipelineConfig) -> Self {
        Self {
            corpus,
            score: config.recency_score,
        }
    }
}

#[async_trait]
impl LayerMatcher for RecencyMatcher {
    fn layer(&self) -> Layer {
        Layer::L6
    }

    async fn find_candidates(
        &self,
        _query: &SearchQuery,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<Candidate>> {
        let hits = self.corpus.recent(filters, limit).await?;
        Ok(hits
            .iter()
            .map(|hit| candidate(hit, Layer::L6, self.score))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::layers::test_support::{corpus, query};

    #[tokio::test]
    async fn test_ignores_query_and_honors_filters() {
        let corpus = corpus().await;
        let matcher = RecencyMatcher::new(corpus, &PipelineConfig::default());

        let all = matcher
            .find_candidates(&query("zzz_no_such_term_999"), &SearchFilters::default(), 10)
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
        assert!(all.windows(2).all(|w| w[0].posted_at >= w[1].posted_at));
        assert!(all.iter().all(|c| c.raw_score == 0.1));

        let remote = SearchFilters {
            remote_only: Some(true),
            ..Default::default()
        };
        let found = matcher
            .find_candidates(&query("anything"), &remote, 10)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
