use async_trait::async_trait;
use jobsearch_core::{Candidate, JobSearchResult, Layer, SearchFilters, SearchQuery};
use std::sync::Arc;

use super::{candidate, LayerMatcher};
use crate::config::PipelineConfig;
use crate::store::JobCorpus;

/// Tokens too common to signal relevance on their own.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "at", "for", "in", "of", "on", "or", "the", "to", "with", "no", "job", "jobs",
];

/// L5: any shared content token; score grows with the fraction matched.
pub struct BroadTokenMatcher {
    corpus: Arc<dyn JobCorpus>,
    cap: f32,
    min_score: f32,
}

impl BroadTokenMatcher {
    /// Matcher over `corpus` using the L5 settings of `config`.
    pub fn new(corpus: Arc<dyn JobCorpus>, config: &PipelineConfig) -> Self {
        Self {
            corpus,
            cap: config.broad_token_cap,
            min_score: config.min_layer_score,
        }
    }
}

/// Distinct non-stop-word tokens, in first-seen order.
fn content_tokens(query: &SearchQuery) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in query.tokens() {
        if !STOP_WORDS.contains(&token) && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

#[async_trait]
impl LayerMatcher for BroadTokenMatcher {
    fn layer(&self) -> Layer {
        Layer::L5
    }

    async fn find_candidates(
        &self,
        query: &SearchQuery,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<Candidate>> {
        let tokens = content_tokens(query);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let total = tokens.len() as f32;
        let hits = self.corpus.token_overlap(&tokens, filters, limit).await?;
        Ok(hits
            .iter()
            .map(|hit| {
                let fraction = (hit.score / total).min(1.0);
                let score = (fraction * self.cap).clamp(self.min_score, self.cap);
                candidate(hit, Layer::L5, score)
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::layers::test_support::{corpus, query};

    #[test]
    fn test_content_tokens_drop_stop_words_and_duplicates() {
        let q = query("jobs for rust and rust kubernetes");
        assert_eq!(content_tokens(&q), vec!["rust", "kubernetes"]);
    }

    #[tokio::test]
    async fn test_fraction_scoring() {
        let corpus = corpus().await;
        let config = PipelineConfig::default();
        let matcher = BroadTokenMatcher::new(corpus, &config);
        let found = matcher
            .find_candidates(&query("rust kubernetes haskell elixir"), &SearchFilters::default(), 10)
            .await
            .unwrap();

        // Acme matches 2 of 4 content tokens.
        assert_eq!(found.len(), 1);
        assert!((found[0].raw_score - 0.25).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_only_stop_words_yields_nothing() {
        let corpus = corpus().await;
        let matcher = BroadTokenMatcher::new(corpus, &PipelineConfig::default());
        let found = matcher
            .find_candidates(&query("the and of"), &SearchFilters::default(), 10)
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
