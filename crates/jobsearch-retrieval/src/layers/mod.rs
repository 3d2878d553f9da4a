//! The six retrieval strategies, behind one matcher contract.
//!
//! A matcher never fails for "no results": an empty batch is a valid outcome.
//! It may fail with a collaborator error when its backing lookup is
//! unreachable; the orchestrator turns that into an empty batch.

mod broad_token;
mod exact;
mod full_text;
mod fuzzy;
mod recency;
mod semantic;

pub use broad_token::BroadTokenMatcher;
pub use exact::ExactPrefixMatcher;
pub use full_text::FullTextMatcher;
pub use fuzzy::FuzzyMatcher;
pub use recency::RecencyMatcher;
pub use semantic::SemanticMatcher;

use async_trait::async_trait;
use jobsearch_core::{Candidate, JobSearchResult, Layer, SearchFilters, SearchQuery};
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::store::{CorpusHit, JobCorpus};

/// One retrieval strategy of the cascade.
#[async_trait]
pub trait LayerMatcher: Send + Sync {
    /// Which layer this matcher implements.
    fn layer(&self) -> Layer;

    /// False when the layer cannot run for this query and must be skipped
    /// without being recorded as executed.
    fn applies_to(&self, _query: &SearchQuery) -> bool {
        true
    }

    /// True if the orchestrator should generate the query embedding before
    /// invoking this layer.
    fn needs_embedding(&self) -> bool {
        false
    }

    /// Candidates for `query`, filtered, at most `limit` of them.
    async fn find_candidates(
        &self,
        query: &SearchQuery,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<Candidate>>;
}

/// The standard L1..L6 matchers, in cascade order.
pub fn default_layers(
    corpus: Arc<dyn JobCorpus>,
    config: &PipelineConfig,
) -> Vec<Box<dyn LayerMatcher>> {
    vec![
        Box::new(ExactPrefixMatcher::new(corpus.clone(), config)),
        Box::new(FullTextMatcher::new(corpus.clone(), config)),
        Box::new(FuzzyMatcher::new(corpus.clone(), config)),
        Box::new(SemanticMatcher::new(corpus.clone(), config)),
        Box::new(BroadTokenMatcher::new(corpus.clone(), config)),
        Box::new(RecencyMatcher::new(corpus, config)),
    ]
}

fn candidate(hit: &CorpusHit, layer: Layer, raw_score: f32) -> Candidate {
    Candidate {
        job_id: hit.job_id,
        raw_score,
        source_layer: layer,
        posted_at: hit.posted_at,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, Utc};
    use jobsearch_core::Job;
    use std::sync::Arc;

    use crate::embedding::LocalEmbedding;
    use crate::normalize::parse_query;
    use crate::store::InMemoryJobCorpus;
    use jobsearch_core::SearchQuery;

    pub async fn corpus() -> Arc<InMemoryJobCorpus> {
        let now = Utc::now();
        let jobs = vec![
            Job::new("Software Engineer", "Acme", now - Duration::hours(5))
                .with_skills(["rust", "kubernetes"])
                .with_description("Build backend services"),
            Job::new("Software Engineering Manager", "Globex", now - Duration::days(2))
                .with_skills(["leadership"]),
            Job::new("Data Scientist", "Initech", now - Duration::days(3))
                .with_skills(["python", "statistics"])
                .with_location("Remote")
                .with_remote(true),
            Job::new("Pastry Chef", "Le Cafe", now - Duration::days(9))
                .with_description("Croissants and laminated dough"),
        ];
        let corpus = InMemoryJobCorpus::new();
        corpus
            .insert_all(jobs, Some(&LocalEmbedding::default()))
            .await
            .unwrap_or_default();
        Arc::new(corpus)
    }

    pub fn query(raw: &str) -> SearchQuery {
        parse_query(raw, 512).unwrap_or_else(|e| panic!("bad test query {raw}: {e}"))
    }
}
