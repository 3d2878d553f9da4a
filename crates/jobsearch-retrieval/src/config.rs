use jobsearch_core::{JobSearchError, JobSearchResult};
use serde::Deserialize;
use std::time::Duration;

/// Policy knobs for the escalation cascade and per-layer scoring.
///
/// Every field has a default so a partial `[search]` table is accepted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    /// Distinct-candidate count that stops escalation after a layer completes.
    #[serde(default = "default_sufficiency_threshold")]
    pub sufficiency_threshold: usize,
    /// Maximum candidates requested from any single layer.
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,
    /// Page size when the request has none.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Largest accepted page size.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// L1 score for an exact title or company match.
    #[serde(default = "default_exact_score")]
    pub exact_score: f32,
    /// L1 score for a prefix match.
    #[serde(default = "default_prefix_score")]
    pub prefix_score: f32,
    /// Upper bound of L2 scores.
    #[serde(default = "default_full_text_max")]
    pub full_text_max: f32,
    /// L3 trigram similarity cutoff.
    #[serde(default = "default_fuzzy_min_similarity")]
    pub fuzzy_min_similarity: f32,
    /// Upper bound of L4 scores.
    #[serde(default = "default_semantic_max")]
    pub semantic_max: f32,
    /// L4 cosine cutoff.
    #[serde(default = "default_semantic_min_similarity")]
    pub semantic_min_similarity: f32,
    /// Upper bound of L5 scores.
    #[serde(default = "default_broad_token_cap")]
    pub broad_token_cap: f32,
    /// Floor for every non-recency layer score.
    #[serde(default = "default_min_layer_score")]
    pub min_layer_score: f32,
    /// Fixed L6 score; must stay below `min_layer_score`.
    #[serde(default = "default_recency_score")]
    pub recency_score: f32,
    /// Added per extra layer that matched the same job.
    #[serde(default = "default_corroboration_bonus")]
    pub corroboration_bonus: f32,
    /// Budget for one layer call.
    #[serde(default = "default_layer_timeout_ms")]
    pub layer_timeout_ms: u64,
    /// Budget for the query embedding call.
    #[serde(default = "default_embedding_timeout_ms")]
    pub embedding_timeout_ms: u64,
    /// Longest accepted query, in characters.
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sufficiency_threshold: default_sufficiency_threshold(),
            candidate_pool: default_candidate_pool(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            exact_score: default_exact_score(),
            prefix_score: default_prefix_score(),
            full_text_max: default_full_text_max(),
            fuzzy_min_similarity: default_fuzzy_min_similarity(),
            semantic_max: default_semantic_max(),
            semantic_min_similarity: default_semantic_min_similarity(),
            broad_token_cap: default_broad_token_cap(),
            min_layer_score: default_min_layer_score(),
            recency_score: default_recency_score(),
            corroboration_bonus: default_corroboration_bonus(),
            layer_timeout_ms: default_layer_timeout_ms(),
            embedding_timeout_ms: default_embedding_timeout_ms(),
            max_query_length: default_max_query_length(),
        }
    }
}

impl PipelineConfig {
    /// Reject combinations that would break the cascade's guarantees.
    pub fn validate(&self) -> JobSearchResult<()> {
        if self.sufficiency_threshold == 0 {
            return Err(JobSearchError::Config(
                "sufficiency_threshold must be at least 1".into(),
            ));
        }
        if self.candidate_pool == 0 || self.default_limit == 0 || self.max_limit == 0 {
            return Err(JobSearchError::Config(
                "candidate_pool, default_limit and max_limit must be positive".into(),
            ));
        }
        if self.default_limit > self.max_limit {
            return Err(JobSearchError::Config(format!(
                "default_limit {} exceeds max_limit {}",
                self.default_limit, self.max_limit
            )));
        }
        if self.recency_score >= self.min_layer_score {
            return Err(JobSearchError::Config(format!(
                "recency_score {} must be lower than min_layer_score {}",
                self.recency_score, self.min_layer_score
            )));
        }
        if self.layer_timeout_ms == 0 || self.embedding_timeout_ms == 0 {
            return Err(JobSearchError::Config("timeouts must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_min_similarity) {
            return Err(JobSearchError::Config(
                "fuzzy_min_similarity must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// [`PipelineConfig::layer_timeout_ms`] as a `Duration`.
    pub fn layer_timeout(&self) -> Duration {
        Duration::from_millis(self.layer_timeout_ms)
    }

    /// [`PipelineConfig::embedding_timeout_ms`] as a `Duration`.
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_millis(self.embedding_timeout_ms)
    }

    /// Clamp a requested page size into `1..=max_limit`.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheConfig {
    /// Cache responses at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Hard expiry of an entry.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum number of cached responses.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl_secs(),
            capacity: default_cache_capacity(),
        }
    }
}

/// A configured synonym entry extending the built-in table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SynonymEntry {
    /// Phrase or single word to match.
    pub phrase: String,
    /// Replacements offered for it.
    pub alternatives: Vec<String>,
}

/// Did-you-mean advisor settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdvisorConfig {
    /// Queries shorter than this (in characters) get no suggestions.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
    /// Largest Levenshtein distance accepted for a correction.
    #[serde(default = "default_max_edit_distance")]
    pub max_edit_distance: usize,
    /// Tokens shorter than this are never corrected.
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,
    /// Entries added to the built-in synonym table.
    #[serde(default)]
    pub synonyms: Vec<SynonymEntry>,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            min_query_len: default_min_query_len(),
            max_edit_distance: default_max_edit_distance(),
            min_token_len: default_min_token_len(),
            synonyms: Vec::new(),
        }
    }
}

/// Which embedding provider to construct.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum EmbeddingConfig {
    /// Deterministic hashing embedding, no network.
    Local {
        #[serde(default = "default_dimension")]
        dimension: usize,
    },
    /// OpenAI-compatible `/embeddings` endpoint.
    Http {
        base_url: String,
        model: String,
        /// Environment variable holding the API key.
        #[serde(default)]
        api_key_env: Option<String>,
        #[serde(default = "default_dimension")]
        dimension: usize,
    },
    /// No embedder: L4 is always skipped.
    Disabled,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig::Local {
            dimension: default_dimension(),
        }
    }
}

fn default_sufficiency_threshold() -> usize {
    20
}
fn default_candidate_pool() -> usize {
    100
}
fn default_limit() -> usize {
    20
}
fn default_max_limit() -> usize {
    100
}
fn default_exact_score() -> f32 {
    1.0
}
fn default_prefix_score() -> f32 {
    0.9
}
fn default_full_text_max() -> f32 {
    0.85
}
fn default_fuzzy_min_similarity() -> f32 {
    0.3
}
fn default_semantic_max() -> f32 {
    0.75
}
fn default_semantic_min_similarity() -> f32 {
    0.1
}
fn default_broad_token_cap() -> f32 {
    0.5
}
fn default_min_layer_score() -> f32 {
    0.15
}
fn default_recency_score() -> f32 {
    0.1
}
fn default_corroboration_bonus() -> f32 {
    0.01
}
fn default_layer_timeout_ms() -> u64 {
    1500
}
fn default_embedding_timeout_ms() -> u64 {
    2500
}
fn default_max_query_length() -> usize {
    512
}
fn default_true() -> bool {
    true
}
fn default_cache_ttl_secs() -> u64 {
    30
}
fn default_cache_capacity() -> usize {
    1024
}
fn default_min_query_len() -> usize {
    3
}
fn default_max_edit_distance() -> usize {
    2
}
fn default_min_token_len() -> usize {
    4
}
fn default_dimension() -> usize {
    256
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_recency_must_stay_below_layer_floor() {
        let config = PipelineConfig {
            recency_score: 0.2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(JobSearchError::Config(_))));
    }

    #[test]
    fn test_clamp_limit() {
        let config = PipelineConfig::default();
        assert_eq!(config.clamp_limit(None), 20);
        assert_eq!(config.clamp_limit(Some(0)), 1);
        assert_eq!(config.clamp_limit(Some(500)), 100);
    }

    #[test]
    fn test_embedding_config_tagged() {
        let config: EmbeddingConfig = serde_json::from_value(serde_json::json!({
            "provider": "http",
            "base_url": "http://localhost:8080/v1",
            "model": "text-embedding-3-small"
        }))
        .unwrap();
        assert!(matches!(config, EmbeddingConfig::Http { dimension: 256, .. }));

        let config: EmbeddingConfig =
            serde_json::from_value(serde_json::json!({"provider": "disabled"})).unwrap();
        assert_eq!(config, EmbeddingConfig::Disabled);
    }

    #[test]
    fn test_partial_pipeline_config() {
        let config: PipelineConfig =
            serde_json::from_value(serde_json::json!({"sufficiency_threshold": 5})).unwrap();
        assert_eq!(config.sufficiency_threshold, 5);
        assert_eq!(config.max_limit, 100);
    }
}
