use async_trait::async_trait;
use jobsearch_core::{JobSearchError, JobSearchResult};
use std::collections::HashMap;

use crate::normalize::tokenize;

/// Trait for computing text embeddings (vector representations).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute embedding vector for a single text.
    async fn embed(&self, text: &str) -> JobSearchResult<Vec<f32>>;

    /// Compute embeddings for a batch of texts.
    async fn embed_batch(&self, texts: &[&str]) -> JobSearchResult<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Dimension of the embedding vectors produced by this provider.
    fn dimension(&self) -> usize;
}

/// Local hashing embedding, no external API needed.
///
/// Words and their character trigrams are hashed into a fixed number of
/// buckets, so near-miss spellings still share part of their mass.
pub struct LocalEmbedding {
    dimension: usize,
}

impl LocalEmbedding {
    /// Hashing embedding with `dimension` buckets.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for LocalEmbedding {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Weight of a character trigram relative to its whole word.
const TRIGRAM_WEIGHT: f32 = 0.35;

#[async_trait]
impl EmbeddingProvider for LocalEmbedding {
    async fn embed(&self, text: &str) -> JobSearchResult<Vec<f32>> {
        let words = tokenize(text);
        if words.is_empty() {
            return Err(JobSearchError::unavailable(
                "local embedder",
                "cannot embed empty text",
            ));
        }

        let mut freq: HashMap<&str, f32> = HashMap::new();
        for word in &words {
            *freq.entry(word.as_str()).or_insert(0.0) += 1.0;
        }

        let total = words.len() as f32;
        let mut vector = vec![0.0f32; self.dimension];

        for (word, count) in &freq {
            let tf = count / total;
            let h1 = fnv1a(word.as_bytes()) as usize;
            let h2 = fnv1a(&[word.as_bytes(), &[1u8]].concat()) as usize;
            vector[h1 % self.dimension] += tf;
            vector[h2 % self.dimension] += tf * 0.7;

            let padded: Vec<char> = format!(" {word} ").chars().collect();
            for window in padded.windows(3) {
                let gram: String = window.iter().collect();
                let h = fnv1a(&[gram.as_bytes(), &[2u8]].concat()) as usize;
                vector[h % self.dimension] += tf * TRIGRAM_WEIGHT;
            }
        }

        l2_normalize(&mut vector);
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Cosine similarity; 0.0 for mismatched or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// FNV-1a, deterministic across runs.
fn fnv1a(data: &[u8]) -> u32 {
    let mut hash: u32 = 2166136261;
    for &byte in data {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[cfg(feature = "http-embeddings")]
pub use http::HttpEmbedding;

#[cfg(feature = "http-embeddings")]
mod http {
    use super::*;
    use serde::{Deserialize, Serialize};

    /// Embeddings from an OpenAI-compatible `POST {base_url}/embeddings` endpoint.
    pub struct HttpEmbedding {
        client: reqwest::Client,
        base_url: String,
        model: String,
        api_key: Option<String>,
        dimension: usize,
    }

    #[derive(Serialize)]
    struct EmbeddingRequest<'a> {
        model: &'a str,
        input: &'a [&'a str],
    }

    #[derive(Deserialize)]
    struct EmbeddingResponse {
        data: Vec<EmbeddingDatum>,
    }

    #[derive(Deserialize)]
    struct EmbeddingDatum {
        embedding: Vec<f32>,
    }

    impl HttpEmbedding {
        /// Client for `{base_url}/embeddings` using `model`.
        pub fn new(
            base_url: impl Into<String>,
            model: impl Into<String>,
            api_key: Option<String>,
            dimension: usize,
        ) -> Self {
            Self {
                client: reqwest::Client::new(),
                base_url: base_url.into().trim_end_matches('/').to_string(),
                model: model.into(),
                api_key,
                dimension,
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for HttpEmbedding {
        async fn embed(&self, text: &str) -> JobSearchResult<Vec<f32>> {
            let mut batch = self.embed_batch(&[text]).await?;
            batch
                .pop()
                .ok_or_else(|| JobSearchError::unavailable("http embedder", "empty response"))
        }

        async fn embed_batch(&self, texts: &[&str]) -> JobSearchResult<Vec<Vec<f32>>> {
            let url = format!("{}/embeddings", self.base_url);
            let mut request = self.client.post(&url).json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            });
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = request
                .send()
                .await
                .map_err(|e| JobSearchError::Http(format!("embedding request failed: {e}")))?;
            let status = response.status();
            if !status.is_success() {
                return Err(JobSearchError::unavailable(
                    "http embedder",
                    format!("status {status}"),
                ));
            }

            let body: EmbeddingResponse = response
                .json()
                .await
                .map_err(|e| JobSearchError::Http(format!("invalid embedding response: {e}")))?;
            if body.data.len() != texts.len() {
                return Err(JobSearchError::unavailable(
                    "http embedder",
                    format!("expected {} vectors, got {}", texts.len(), body.data.len()),
                ));
            }
            Ok(body.data.into_iter().map(|d| d.embedding).collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_embedding_dimension() {
        let emb = LocalEmbedding::new(128);
        assert_eq!(emb.dimension(), 128);
        let vec = emb.embed("rust developer").await.unwrap();
        assert_eq!(vec.len(), 128);
    }

    #[tokio::test]
    async fn test_local_embedding_normalized() {
        let emb = LocalEmbedding::default();
        let vec = emb.embed("senior backend engineer kubernetes").await.unwrap();
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_related_titles_closer_than_unrelated() {
        let emb = LocalEmbedding::default();
        let v1 = emb.embed("software engineer backend").await.unwrap();
        let v2 = emb.embed("backend software developer").await.unwrap();
        let v3 = emb.embed("pastry chef bakery").await.unwrap();
        assert!(cosine_similarity(&v1, &v2) > cosine_similarity(&v1, &v3));
    }

    #[tokio::test]
    async fn test_typo_keeps_some_similarity() {
        let emb = LocalEmbedding::default();
        let v1 = emb.embed("software engineer").await.unwrap();
        let v2 = emb.embed("sofware enginer").await.unwrap();
        assert!(cosine_similarity(&v1, &v2) > 0.1);
    }

    #[tokio::test]
    async fn test_local_embedding_empty() {
        let emb = LocalEmbedding::default();
        assert!(emb.embed("").await.is_err());
        assert!(emb.embed("!!!").await.is_err());
    }

    #[tokio::test]
    async fn test_local_embedding_deterministic() {
        let emb = LocalEmbedding::default();
        let v1 = emb.embed("data scientist").await.unwrap();
        let v2 = emb.embed("data scientist").await.unwrap();
        assert_eq!(v1, v2);
    }

    #[test]
    fn test_cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
