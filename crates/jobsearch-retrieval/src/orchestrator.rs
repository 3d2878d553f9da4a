use jobsearch_core::{
    Candidate, JobSearchError, JobSearchResult, Layer, SearchFilters, SearchQuery,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::embedding::EmbeddingProvider;
use crate::layers::LayerMatcher;

/// Candidates produced by one executed layer.
#[derive(Debug, Clone)]
pub struct LayerBatch {
    /// Layer that ran.
    pub layer: Layer,
    /// Its matches; empty when it failed.
    pub candidates: Vec<Candidate>,
    /// Wall time of the call.
    pub elapsed: Duration,
    /// Set when the layer failed or timed out and was degraded to empty.
    pub error: Option<String>,
}

/// Outcome of one pass through the cascade.
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    /// One batch per executed layer, in invocation order.
    pub batches: Vec<LayerBatch>,
    /// Time spent generating the query embedding, if attempted.
    pub embedding_elapsed: Option<Duration>,
    /// Distinct jobs across all batches.
    pub distinct_candidates: usize,
}

impl PipelineRun {
    /// Layers that actually executed, in invocation order.
    pub fn layers_used(&self) -> Vec<Layer> {
        self.batches.iter().map(|b| b.layer).collect()
    }

    /// All candidates considered, before deduplication.
    pub fn total_candidates(&self) -> usize {
        self.batches.iter().map(|b| b.candidates.len()).sum()
    }

    /// Every candidate, in layer-priority order.
    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.batches.iter().flat_map(|b| b.candidates.iter())
    }

    /// True if the given layer contributed at least one candidate.
    pub fn contributed(&self, layer: Layer) -> bool {
        self.batches
            .iter()
            .any(|b| b.layer == layer && !b.candidates.is_empty())
    }

    /// Every layer ran and nothing matched: the filtered corpus is empty.
    pub fn is_exhausted(&self) -> bool {
        self.distinct_candidates == 0
    }
}

/// Runs layer matchers in strict priority order until enough distinct
/// candidates have accumulated.
pub struct EscalationOrchestrator {
    layers: Vec<Box<dyn LayerMatcher>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    config: PipelineConfig,
}

impl EscalationOrchestrator {
    /// Fails with [`JobSearchError::Pipeline`] unless `layers` are in strictly
    /// increasing layer order.
    pub fn new(
        layers: Vec<Box<dyn LayerMatcher>>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        config: PipelineConfig,
    ) -> JobSearchResult<Self> {
        if layers.windows(2).any(|w| w[0].layer() >= w[1].layer()) {
            return Err(JobSearchError::Pipeline(
                "layer matchers must be in strictly increasing cascade order".into(),
            ));
        }
        Ok(Self {
            layers,
            embedder,
            config,
        })
    }

    /// Execute the cascade for `query`.
    ///
    /// The query embedding is generated at most once, and only when a layer
    /// that needs it is reached. With `semantic` false such layers are skipped.
    /// Layer failures and timeouts never abort the run.
    pub async fn run(
        &self,
        query: &mut SearchQuery,
        filters: &SearchFilters,
        semantic: bool,
    ) -> PipelineRun {
        let threshold = self.config.sufficiency_threshold;
        let pool = self.config.candidate_pool;
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut run = PipelineRun::default();
        let mut embedding_attempted = false;

        for matcher in &self.layers {
            if seen.len() >= threshold {
                debug!(distinct = seen.len(), threshold, "Sufficiency threshold reached");
                break;
            }

            let layer = matcher.layer();
            if matcher.needs_embedding() {
                if !semantic {
                    debug!(layer = %layer, "Semantic layers disabled for this request");
                    continue;
                }
                if !embedding_attempted {
                    embedding_attempted = true;
                    let started = Instant::now();
                    let embedding = self.embed(query.text()).await;
                    query.embedding = embedding;
                    run.embedding_elapsed = Some(started.elapsed());
                }
            }
            if !matcher.applies_to(query) {
                debug!(layer = %layer, "Layer not applicable, skipped");
                continue;
            }

            let started = Instant::now();
            let outcome = tokio::time::timeout(
                self.config.layer_timeout(),
                matcher.find_candidates(query, filters, pool),
            )
            .await;

            let (candidates, error) = match outcome {
                Ok(Ok(candidates)) => (candidates, None),
                Ok(Err(e)) => {
                    warn!(layer = %layer, strategy = layer.strategy(), error = %e, "Layer failed, continuing");
                    (Vec::new(), Some(e.to_string()))
                }
                Err(_) => {
                    let e = JobSearchError::Timeout {
                        collaborator: layer.strategy().to_string(),
                        after_ms: self.config.layer_timeout_ms,
                    };
                    warn!(layer = %layer, error = %e, "Layer timed out, continuing");
                    (Vec::new(), Some(e.to_string()))
                }
            };

            seen.extend(candidates.iter().map(|c| c.job_id));
            debug!(
                layer = %layer,
                found = candidates.len(),
                distinct = seen.len(),
                "Layer completed"
            );
            run.batches.push(LayerBatch {
                layer,
                candidates,
                elapsed: started.elapsed(),
                error,
            });
        }

        run.distinct_candidates = seen.len();
        if run.is_exhausted() {
            info!(query = %query.normalized, "Pipeline exhausted with no candidates");
        }
        run
    }

    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match tokio::time::timeout(self.config.embedding_timeout(), embedder.embed(text)).await {
            Ok(Ok(vector)) if !vector.is_empty() => Some(vector),
            Ok(Ok(_)) => {
                warn!("Embedder returned an empty vector, semantic layer skipped");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Embedding unavailable, semantic layer skipped");
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.embedding_timeout_ms,
                    "Embedding timed out, semantic layer skipped"
                );
                None
            }
        }
    }
}
