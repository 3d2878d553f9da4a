use jobsearch_core::{
    Job, JobSearchError, JobSearchResult, Layer, QueryEcho, SearchFilters, SearchQuery,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::advisor::{DidYouMeanAdvisor, Suggestion};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::{CacheConfig, PipelineConfig};
use crate::embedding::EmbeddingProvider;
use crate::layers::{default_layers, LayerMatcher};
use crate::normalize::{classify, normalize, parse_query};
use crate::orchestrator::{EscalationOrchestrator, PipelineRun};
use crate::paginate::{paginate, Pagination};
use crate::ranker;
use crate::stats::{SearchStats, StatsSnapshot};
use crate::store::JobCorpus;

/// A search as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Raw query text.
    pub query: String,
    /// 1-based page, default 1.
    #[serde(default)]
    pub page: Option<usize>,
    /// Page size, clamped to `max_limit`.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Constraints applied by every layer.
    #[serde(default)]
    pub filters: SearchFilters,
    /// Allow the semantic layer. Defaults to true.
    #[serde(default)]
    pub use_enhanced: Option<bool>,
}

impl SearchRequest {
    /// A request for `query` with every option at its default.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Stage timings in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchTiming {
    /// L1 and L2.
    pub stage1_ms: f64,
    /// L3 through L6, including the embedding call.
    pub stage2_ms: f64,
    /// Whole request, including hydration.
    pub total_ms: f64,
    /// Keyed by layer label.
    #[serde(rename = "perLayer_ms")]
    pub per_layer_ms: BTreeMap<String, f64>,
}

/// The search response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// The requested page, in rank order.
    pub jobs: Vec<Job>,
    /// Paging metadata over the full ranked list.
    pub pagination: Pagination,
    /// The query as understood.
    pub query: QueryEcho,
    /// Stage timings.
    pub timing: SearchTiming,
    /// Spelling correction when strict layers found nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did_you_mean: Option<String>,
    /// True when L3 to L6 contributed a result.
    pub fallback_used: bool,
    /// Executed layers, in order.
    pub layers_used: Vec<String>,
    /// Candidates before deduplication.
    pub total_candidates: usize,
}

impl SearchResponse {
    /// Well-formed envelope for a failure that degradation could not absorb.
    pub fn error_envelope(raw_query: &str, page: usize, limit: usize) -> Self {
        let normalized = normalize(raw_query);
        let query_type = classify(raw_query, &normalized);
        Self {
            jobs: Vec::new(),
            pagination: Pagination {
                page: page.max(1),
                limit: limit.max(1),
                total: 0,
                total_pages: 0,
            },
            query: QueryEcho {
                original: raw_query.to_string(),
                normalized,
                embedding: false,
                query_type,
            },
            timing: SearchTiming::default(),
            did_you_mean: None,
            fallback_used: true,
            layers_used: vec!["error".to_string()],
            total_candidates: 0,
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Entry point for searches and did-you-mean lookups.
///
/// Owns the orchestrator, the advisor, the optional response cache and the
/// stats counters. Safe to share across request handlers behind an `Arc`.
pub struct JobSearchService {
    corpus: Arc<dyn JobCorpus>,
    orchestrator: EscalationOrchestrator,
    advisor: Arc<DidYouMeanAdvisor>,
    cache: Option<ResponseCache<CacheKey, SearchResponse>>,
    stats: SearchStats,
    config: PipelineConfig,
}

impl JobSearchService {
    /// Build a service with the standard six layers.
    pub fn new(
        corpus: Arc<dyn JobCorpus>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        advisor: Arc<DidYouMeanAdvisor>,
        config: PipelineConfig,
    ) -> JobSearchResult<Self> {
        let layers = default_layers(corpus.clone(), &config);
        Self::with_layers(corpus, layers, embedder, advisor, config)
    }

    /// Build a service with a custom layer set.
    pub fn with_layers(
        corpus: Arc<dyn JobCorpus>,
        layers: Vec<Box<dyn LayerMatcher>>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        advisor: Arc<DidYouMeanAdvisor>,
        config: PipelineConfig,
    ) -> JobSearchResult<Self> {
        config.validate()?;
        let orchestrator = EscalationOrchestrator::new(layers, embedder, config.clone())?;
        Ok(Self {
            corpus,
            orchestrator,
            advisor,
            cache: None,
            stats: SearchStats::default(),
            config,
        })
    }

    /// Enable the response cache. A disabled config leaves caching off.
    pub fn with_cache(mut self, config: &CacheConfig) -> Self {
        self.cache = config
            .enabled
            .then(|| ResponseCache::from_config(config));
        self
    }

    /// Pipeline settings in effect.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The did-you-mean advisor.
    pub fn advisor(&self) -> &DidYouMeanAdvisor {
        &self.advisor
    }

    /// Run a search.
    ///
    /// Fails with [`JobSearchError::InvalidQuery`] for unusable input. Any
    /// other error means degradation was exhausted and the caller should
    /// answer with [`SearchResponse::error_envelope`].
    pub async fn search(&self, request: &SearchRequest) -> JobSearchResult<SearchResponse> {
        let started = Instant::now();
        let query = parse_query(&request.query, self.config.max_query_length)?;
        let page = request.page.unwrap_or(1).max(1);
        let limit = self.config.clamp_limit(request.limit);
        let semantic = request.use_enhanced.unwrap_or(true);

        let outcome = match &self.cache {
            Some(cache) => {
                let echo = query.echo();
                let key = CacheKey {
                    normalized: query.normalized.clone(),
                    filters: request.filters.clone(),
                    page,
                    limit,
                    semantic,
                };
                cache
                    .get_or_try_compute(key, || {
                        self.execute(query, &request.filters, page, limit, semantic, started)
                    })
                    .await
                    .map(|(mut response, hit)| {
                        if hit {
                            // The key ignores casing, so the echo must come from this request.
                            response.query = QueryEcho {
                                embedding: response.query.embedding,
                                ..echo
                            };
                            self.stats.record_cache_hit();
                            debug!(query = %response.query.normalized, "Served from cache");
                        }
                        response
                    })
            }
            None => {
                self.execute(query, &request.filters, page, limit, semantic, started)
                    .await
            }
        };

        if let Err(e) = &outcome {
            self.stats.record_error();
            warn!(error = %e, "Search failed");
        }
        outcome
    }

    async fn execute(
        &self,
        mut query: SearchQuery,
        filters: &SearchFilters,
        page: usize,
        limit: usize,
        semantic: bool,
        started: Instant,
    ) -> JobSearchResult<SearchResponse> {
        let run = self.orchestrator.run(&mut query, filters, semantic).await;

        let ranked = ranker::merge(run.candidates(), self.config.corroboration_bonus);
        ranker::check_invariants(&ranked)?;
        let fallback_used = ranked
            .iter()
            .any(|r| r.matched_layers.iter().any(|l| l.is_fallback()));

        let (slice, pagination) = paginate(&ranked, page, limit);
        let ids: Vec<Uuid> = slice.iter().map(|r| r.job_id).collect();
        let jobs = self.hydrate(&ids).await?;

        let did_you_mean = if run.contributed(Layer::L1) || run.contributed(Layer::L2) {
            None
        } else {
            self.advisor.suggest_correction(&query.original)
        };

        let mut timing = stage_timing(&run);
        timing.total_ms = millis(started.elapsed());

        self.stats.record_run(&run, fallback_used);
        let layers_used: Vec<String> = run
            .layers_used()
            .iter()
            .map(|l| l.label().to_string())
            .collect();
        info!(
            query_type = %query.query_type,
            layers_used = ?layers_used,
            total_candidates = run.total_candidates(),
            results = pagination.total,
            fallback_used,
            total_ms = timing.total_ms,
            "Search completed"
        );

        Ok(SearchResponse {
            jobs,
            pagination,
            query: query.echo(),
            timing,
            did_you_mean,
            fallback_used,
            layers_used,
            total_candidates: run.total_candidates(),
        })
    }

    async fn hydrate(&self, ids: &[Uuid]) -> JobSearchResult<Vec<Job>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        tokio::time::timeout(self.config.layer_timeout(), self.corpus.get_jobs(ids))
            .await
            .map_err(|_| JobSearchError::Timeout {
                collaborator: "job store".into(),
                after_ms: self.config.layer_timeout_ms,
            })?
    }

    /// Did-you-mean for `query`. Never fails.
    pub fn suggest(&self, query: &str) -> Suggestion {
        self.stats.record_suggestion();
        self.advisor.advise(query)
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

fn stage_timing(run: &PipelineRun) -> SearchTiming {
    let mut timing = SearchTiming::default();
    for batch in &run.batches {
        let ms = millis(batch.elapsed);
        if batch.layer.is_fallback() {
            timing.stage2_ms += ms;
        } else {
            timing.stage1_ms += ms;
        }
        *timing
            .per_layer_ms
            .entry(batch.layer.label().to_string())
            .or_insert(0.0) += ms;
    }
    if let Some(embedding) = run.embedding_elapsed {
        timing.stage2_ms += millis(embedding);
    }
    timing
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::AdvisorConfig;
    use crate::embedding::LocalEmbedding;
    use crate::layers::test_support::corpus;
    use jobsearch_core::QueryType;

    async fn service() -> JobSearchService {
        let corpus = corpus().await;
        let advisor = DidYouMeanAdvisor::from_corpus(corpus.as_ref(), AdvisorConfig::default())
            .await
            .unwrap();
        JobSearchService::new(
            corpus,
            Some(Arc::new(LocalEmbedding::default())),
            Arc::new(advisor),
            PipelineConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_exact_title_ranks_first() {
        let service = service().await;
        let response = service
            .search(&SearchRequest::new("Software Engineer"))
            .await
            .unwrap();
        assert_eq!(response.jobs[0].company, "Acme");
        assert_eq!(response.layers_used[0], "L1");
        assert!(response.did_you_mean.is_none());
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let service = service().await;
        let err = service.search(&SearchRequest::new("   ")).await.unwrap_err();
        assert!(matches!(err, JobSearchError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_timing_has_entry_per_layer() {
        let service = service().await;
        let response = service
            .search(&SearchRequest::new("qqqq wwww"))
            .await
            .unwrap();
        assert_eq!(response.timing.per_layer_ms.len(), response.layers_used.len());
        assert!(response.timing.total_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_disabling_enhanced_skips_semantic_layer() {
        let service = service().await;
        let request = SearchRequest {
            use_enhanced: Some(false),
            ..SearchRequest::new("qqqq wwww")
        };
        let response = service.search(&request).await.unwrap();
        assert!(!response.layers_used.contains(&"L4".to_string()));
        assert!(!response.query.embedding);
        assert!(!response.jobs.is_empty());
    }

    #[tokio::test]
    async fn test_cache_hit_is_counted() {
        let service = service().await.with_cache(&CacheConfig::default());
        let request = SearchRequest::new("data scientist");
        let first = service.search(&request).await.unwrap();
        let second = service.search(&request).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(service.stats().cache_hits, 1);
        assert_eq!(service.stats().searches, 2);
    }

    #[tokio::test]
    async fn test_cache_hit_echoes_current_request() {
        let service = service().await.with_cache(&CacheConfig::default());
        let first = service
            .search(&SearchRequest::new("Stripe Payments"))
            .await
            .unwrap();
        let second = service
            .search(&SearchRequest::new("stripe payments"))
            .await
            .unwrap();

        assert_eq!(service.stats().cache_hits, 1);
        assert_eq!(first.query.original, "Stripe Payments");
        assert_eq!(first.query.query_type, QueryType::CompanyOrTitle);
        assert_eq!(second.query.original, "stripe payments");
        assert_eq!(second.query.normalized, "stripe payments");
        assert_eq!(second.query.query_type, QueryType::Compound);
        assert_eq!(second.query.embedding, first.query.embedding);
        assert_eq!(second.jobs, first.jobs);
    }

    #[test]
    fn test_error_envelope_shape() {
        let json = serde_json::to_value(SearchResponse::error_envelope("rust", 1, 20)).unwrap();
        assert_eq!(json["layersUsed"], serde_json::json!(["error"]));
        assert_eq!(json["fallbackUsed"], true);
        assert!(json["jobs"].as_array().unwrap().is_empty());
        assert!(json.get("didYouMean").is_none());
        assert!(json["timing"].get("perLayer_ms").is_some());
    }
}
