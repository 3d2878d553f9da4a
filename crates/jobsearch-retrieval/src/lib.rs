//! Multi-layer job retrieval with escalation, ranking and did-you-mean.
//!
//! A query is normalized and classified, then run through six progressively
//! looser layers (exact/prefix, full-text, fuzzy, semantic, broad-token,
//! recency) until enough distinct candidates are found. Candidates are merged,
//! ranked with a total order and paginated.
//!
//! # Main types
//!
//! - [`JobSearchService`] — Facade assembling the full search response.
//! - [`EscalationOrchestrator`] — Runs the layer cascade with timeouts and degradation.
//! - [`LayerMatcher`] — Contract shared by the six retrieval layers.
//! - [`JobCorpus`] — Read-only corpus lookups; [`InMemoryJobCorpus`] implements it.
//! - [`DidYouMeanAdvisor`] — Spelling correction and alternative phrasings.
//! - [`ResponseCache`] — Short-TTL, single-flight response cache.
//! - [`EmbeddingProvider`] — Text-to-vector trait; [`LocalEmbedding`] needs no network.

/// Did-you-mean dictionary, synonym table and advisor.
pub mod advisor;
/// BM25 inverted index for full-text retrieval.
pub mod bm25;
/// Single-flight response cache with hard TTL.
pub mod cache;
/// Pipeline, cache, advisor and embedding configuration.
pub mod config;
/// Embedding provider trait and implementations.
pub mod embedding;
/// The six layer matchers.
pub mod layers;
/// Query normalization and classification.
pub mod normalize;
/// Escalation cascade over the layer matchers.
pub mod orchestrator;
/// Page slicing.
pub mod paginate;
/// Candidate merging and result ordering.
pub mod ranker;
/// Search response assembly.
pub mod service;
/// Process-wide counters.
pub mod stats;
/// Corpus contract and in-memory implementation.
pub mod store;
/// Trigram similarity.
pub mod trigram;

pub use advisor::{DidYouMeanAdvisor, Suggestion, SynonymTable, TermDictionary};
pub use bm25::Bm25Index;
pub use cache::{CacheKey, ResponseCache};
pub use config::{AdvisorConfig, CacheConfig, EmbeddingConfig, PipelineConfig, SynonymEntry};
#[cfg(feature = "http-embeddings")]
pub use embedding::HttpEmbedding;
pub use embedding::{EmbeddingProvider, LocalEmbedding};
pub use layers::{default_layers, LayerMatcher};
pub use normalize::parse_query;
pub use orchestrator::{EscalationOrchestrator, LayerBatch, PipelineRun};
pub use paginate::{paginate, Pagination};
pub use service::{JobSearchService, SearchRequest, SearchResponse, SearchTiming};
pub use stats::{SearchStats, StatsSnapshot};
pub use store::{CorpusHit, InMemoryJobCorpus, JobCorpus};
