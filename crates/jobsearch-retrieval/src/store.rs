use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobsearch_core::{Job, JobSearchError, JobSearchResult, SearchFilters};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::bm25::Bm25Index;
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::normalize::{normalize, tokenize};
use crate::trigram::{set_similarity, trigrams};

/// One job returned by a corpus lookup, with the provider's raw score.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusHit {
    /// Matched job.
    pub job_id: Uuid,
    /// Posting time, for tie-breaking.
    pub posted_at: DateTime<Utc>,
    /// Lookup-specific raw score.
    pub score: f32,
}

/// Read-only job corpus with the lookups the layer matchers need.
///
/// Every lookup applies `filters` before truncating to `limit`, and returns
/// hits ordered by descending score, then newest first, then id.
#[async_trait]
pub trait JobCorpus: Send + Sync {
    /// Jobs whose normalized title or company equals `text`.
    async fn exact_matches(
        &self,
        text: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>>;

    /// Jobs whose normalized title or company starts with `text` without equaling it.
    async fn prefix_matches(
        &self,
        text: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>>;

    /// Full-text relevance search. With `phrase`, the job text must contain `text` verbatim.
    async fn full_text(
        &self,
        text: &str,
        phrase: bool,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>>;

    /// Trigram similarity on title and company; hits below `min_similarity` are dropped.
    async fn fuzzy(
        &self,
        text: &str,
        min_similarity: f32,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>>;

    /// Cosine similarity against stored job embeddings.
    async fn nearest(
        &self,
        embedding: &[f32],
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>>;

    /// Jobs sharing at least one token; the score is the count of distinct shared tokens.
    async fn token_overlap(
        &self,
        tokens: &[String],
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>>;

    /// Newest filter-matching jobs. Scores are zero.
    async fn recent(&self, filters: &SearchFilters, limit: usize) -> JobSearchResult<Vec<CorpusHit>>;

    /// Fetch full records, in the order of `ids`. Unknown ids are skipped.
    async fn get_jobs(&self, ids: &[Uuid]) -> JobSearchResult<Vec<Job>>;

    /// Title, company and skill tokens across the corpus, one entry per occurrence.
    async fn vocabulary(&self) -> JobSearchResult<Vec<String>>;

    /// Number of jobs.
    async fn count(&self) -> JobSearchResult<usize>;
}

/// Per-job lookup structures, built once at insert time.
struct IndexedJob {
    job: Job,
    title: String,
    company: String,
    text: String,
    tokens: HashSet<String>,
    title_grams: HashSet<String>,
    company_grams: HashSet<String>,
}

impl IndexedJob {
    fn new(job: Job) -> Self {
        let searchable = job.searchable_text();
        Self {
            title: normalize(&job.title),
            company: normalize(&job.company),
            text: normalize(&searchable),
            tokens: tokenize(&searchable).into_iter().collect(),
            title_grams: trigrams(&job.title),
            company_grams: trigrams(&job.company),
            job,
        }
    }

    fn hit(&self, score: f32) -> CorpusHit {
        CorpusHit {
            job_id: self.job.id,
            posted_at: self.job.posted_at,
            score,
        }
    }
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, IndexedJob>,
    bm25: Bm25Index,
}

impl Inner {
    fn admitted<'a>(
        &'a self,
        filters: &'a SearchFilters,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a IndexedJob> + 'a {
        self.jobs.values().filter(move |j| filters.matches(&j.job, now))
    }
}

/// In-memory corpus with brute-force lookups and a BM25 index.
/// Suitable for development and small corpora.
pub struct InMemoryJobCorpus {
    inner: RwLock<Inner>,
}

impl InMemoryJobCorpus {
    /// An empty corpus.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Insert or replace a job.
    pub async fn insert(&self, job: Job) {
        let skills = job.skills.join(" ");
        let fields: [(&str, f32); 5] = [
            (job.title.as_str(), 2.0),
            (job.company.as_str(), 1.0),
            (skills.as_str(), 1.0),
            (job.location.as_deref().unwrap_or(""), 1.0),
            (job.description.as_str(), 1.0),
        ];

        let mut inner = self.inner.write().await;
        inner.bm25.add_document(job.id, &fields);
        inner.jobs.insert(job.id, IndexedJob::new(job));
    }

    /// Insert many jobs, computing missing embeddings with `embedder` if given.
    pub async fn insert_all(
        &self,
        jobs: Vec<Job>,
        embedder: Option<&dyn EmbeddingProvider>,
    ) -> JobSearchResult<usize> {
        let mut inserted = 0;
        for mut job in jobs {
            if job.embedding.is_none() {
                if let Some(embedder) = embedder {
                    job.embedding = Some(embedder.embed(&embedding_text(&job)).await?);
                }
            }
            self.insert(job).await;
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Load a JSONL file of jobs (one JSON object per line).
    pub async fn from_jsonl(
        path: &Path,
        embedder: Option<&dyn EmbeddingProvider>,
    ) -> JobSearchResult<Self> {
        let data = tokio::fs::read_to_string(path).await.map_err(|e| {
            JobSearchError::Config(format!("Failed to read corpus '{}': {e}", path.display()))
        })?;

        let mut jobs = Vec::new();
        for (line_no, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let job: Job = serde_json::from_str(line).map_err(|e| {
                JobSearchError::Config(format!("Invalid job on line {}: {e}", line_no + 1))
            })?;
            jobs.push(job);
        }

        let corpus = Self::new();
        let count = corpus.insert_all(jobs, embedder).await?;
        info!(path = %path.display(), jobs = count, "Corpus loaded");
        Ok(corpus)
    }

    /// Remove a job. Returns true if it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        inner.bm25.remove_document(id);
        inner.jobs.remove(&id).is_some()
    }
}

impl Default for InMemoryJobCorpus {
    fn default() -> Self {
        Self::new()
    }
}

/// Text embedded for a job: the fields that describe what the role is.
pub fn embedding_text(job: &Job) -> String {
    format!("{} {} {}", job.title, job.company, job.skills.join(" "))
}

fn rank(mut hits: Vec<CorpusHit>, limit: usize) -> Vec<CorpusHit> {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.posted_at.cmp(&a.posted_at))
            .then_with(|| a.job_id.cmp(&b.job_id))
    });
    hits.truncate(limit);
    hits
}

#[async_trait]
impl JobCorpus for InMemoryJobCorpus {
    async fn exact_matches(
        &self,
        text: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>> {
        let text = normalize(text);
        let inner = self.inner.read().await;
        let hits = inner
            .admitted(filters, Utc::now())
            .filter(|j| j.title == text || j.company == text)
            .map(|j| j.hit(1.0))
            .collect();
        Ok(rank(hits, limit))
    }

    async fn prefix_matches(
        &self,
        text: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>> {
        let text = normalize(text);
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let inner = self.inner.read().await;
        let hits = inner
            .admitted(filters, Utc::now())
            .filter(|j| j.title != text && j.company != text)
            .filter(|j| j.title.starts_with(&text) || j.company.starts_with(&text))
            .map(|j| j.hit(1.0))
            .collect();
        Ok(rank(hits, limit))
    }

    async fn full_text(
        &self,
        text: &str,
        phrase: bool,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>> {
        let needle = normalize(text);
        let now = Utc::now();
        let inner = self.inner.read().await;
        let admit = |id: &Uuid| {
            inner.jobs.get(id).is_some_and(|j| {
                filters.matches(&j.job, now) && (!phrase || j.text.contains(&needle))
            })
        };
        let hits = inner
            .bm25
            .search(text, admit)
            .into_iter()
            .filter_map(|(id, score)| inner.jobs.get(&id).map(|j| j.hit(score)))
            .collect();
        Ok(rank(hits, limit))
    }

    async fn fuzzy(
        &self,
        text: &str,
        min_similarity: f32,
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>> {
        let query_grams = trigrams(text);
        if query_grams.is_empty() {
            return Ok(Vec::new());
        }
        let inner = self.inner.read().await;
        let hits = inner
            .admitted(filters, Utc::now())
            .filter_map(|j| {
                let score = set_similarity(&query_grams, &j.title_grams)
                    .max(set_similarity(&query_grams, &j.company_grams));
                (score >= min_similarity).then(|| j.hit(score))
            })
            .collect();
        Ok(rank(hits, limit))
    }

    async fn nearest(
        &self,
        embedding: &[f32],
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>> {
        if embedding.is_empty() {
            return Err(JobSearchError::unavailable("vector index", "empty query embedding"));
        }
        let inner = self.inner.read().await;
        let hits = inner
            .admitted(filters, Utc::now())
            .filter_map(|j| {
                let stored = j.job.embedding.as_deref()?;
                Some(j.hit(cosine_similarity(embedding, stored)))
            })
            .collect();
        Ok(rank(hits, limit))
    }

    async fn token_overlap(
        &self,
        tokens: &[String],
        filters: &SearchFilters,
        limit: usize,
    ) -> JobSearchResult<Vec<CorpusHit>> {
        let wanted: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        let inner = self.inner.read().await;
        let hits = inner
            .admitted(filters, Utc::now())
            .filter_map(|j| {
                let shared = wanted.iter().filter(|t| j.tokens.contains(**t)).count();
                (shared > 0).then(|| j.hit(shared as f32))
            })
            .collect();
        Ok(rank(hits, limit))
    }

    async fn recent(&self, filters: &SearchFilters, limit: usize) -> JobSearchResult<Vec<CorpusHit>> {
        let inner = self.inner.read().await;
        let hits = inner
            .admitted(filters, Utc::now())
            .map(|j| j.hit(0.0))
            .collect();
        Ok(rank(hits, limit))
    }

    async fn get_jobs(&self, ids: &[Uuid]) -> JobSearchResult<Vec<Job>> {
        let inner = self.inner.read().await;
        let jobs: Vec<Job> = ids
            .iter()
            .filter_map(|id| inner.jobs.get(id).map(|j| j.job.clone()))
            .collect();
        if jobs.len() < ids.len() {
            debug!(requested = ids.len(), found = jobs.len(), "Some job ids no longer exist");
        }
        Ok(jobs)
    }

    async fn vocabulary(&self) -> JobSearchResult<Vec<String>> {
        let inner = self.inner.read().await;
        let mut terms = Vec::new();
        for j in inner.jobs.values() {
            terms.extend(tokenize(&j.job.title));
            terms.extend(tokenize(&j.job.company));
            for skill in &j.job.skills {
                terms.extend(tokenize(skill));
            }
        }
        Ok(terms)
    }

    async fn count(&self) -> JobSearchResult<usize> {
        Ok(self.inner.read().await.jobs.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::embedding::LocalEmbedding;
    use chrono::Duration;

    async fn corpus() -> (InMemoryJobCorpus, Vec<Uuid>) {
        let now = Utc::now();
        let jobs = vec![
            Job::new("Software Engineer", "Acme", now - Duration::days(1))
                .with_skills(["rust", "postgres"])
                .with_location("Berlin")
                .with_remote(true),
            Job::new("Software Engineer II", "Globex", now - Duration::days(2))
                .with_skills(["go"])
                .with_location("Austin"),
            Job::new("Pastry Chef", "Le Cafe", now - Duration::days(40))
                .with_description("Croissants and laminated dough"),
        ];
        let ids = jobs.iter().map(|j| j.id).collect();
        let corpus = InMemoryJobCorpus::new();
        let embedder = LocalEmbedding::default();
        corpus.insert_all(jobs, Some(&embedder)).await.unwrap();
        (corpus, ids)
    }

    #[tokio::test]
    async fn test_exact_then_prefix_are_disjoint() {
        let (corpus, ids) = corpus().await;
        let filters = SearchFilters::default();

        let exact = corpus.exact_matches("software engineer", &filters, 10).await.unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].job_id, ids[0]);

        let prefix = corpus.prefix_matches("software engineer", &filters, 10).await.unwrap();
        assert_eq!(prefix.len(), 1);
        assert_eq!(prefix[0].job_id, ids[1]);
    }

    #[tokio::test]
    async fn test_filters_applied_before_limit() {
        let (corpus, ids) = corpus().await;
        let filters = SearchFilters {
            location: Some("austin".into()),
            ..Default::default()
        };
        let hits = corpus.full_text("software", false, &filters, 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].job_id, ids[1]);
    }

    #[tokio::test]
    async fn test_phrase_requires_contiguous_match() {
        let (corpus, ids) = corpus().await;
        let filters = SearchFilters::default();
        let hits = corpus.full_text("laminated dough", true, &filters, 10).await.unwrap();
        assert_eq!(hits.iter().map(|h| h.job_id).collect::<Vec<_>>(), vec![ids[2]]);

        let hits = corpus.full_text("dough laminated", true, &filters, 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_fuzzy_respects_cutoff() {
        let (corpus, ids) = corpus().await;
        let hits = corpus
            .fuzzy("sofware enginer", 0.3, &SearchFilters::default(), 10)
            .await
            .unwrap();
        let found: Vec<Uuid> = hits.iter().map(|h| h.job_id).collect();
        assert!(found.contains(&ids[0]));
        assert!(found.contains(&ids[1]));
        assert!(!found.contains(&ids[2]));
        assert!(hits.iter().all(|h| h.score >= 0.3));
    }

    #[tokio::test]
    async fn test_recent_orders_newest_first() {
        let (corpus, ids) = corpus().await;
        let hits = corpus.recent(&SearchFilters::default(), 10).await.unwrap();
        assert_eq!(hits.iter().map(|h| h.job_id).collect::<Vec<_>>(), ids);
    }

    #[tokio::test]
    async fn test_token_overlap_counts_distinct_tokens() {
        let (corpus, ids) = corpus().await;
        let tokens = vec!["rust".to_string(), "postgres".to_string(), "haskell".to_string()];
        let hits = corpus
            .token_overlap(&tokens, &SearchFilters::default(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].job_id, ids[0]);
        assert_eq!(hits[0].score, 2.0);
    }

    #[tokio::test]
    async fn test_nearest_rejects_empty_embedding() {
        let (corpus, _) = corpus().await;
        assert!(corpus.nearest(&[], &SearchFilters::default(), 5).await.is_err());
    }

    #[tokio::test]
    async fn test_get_jobs_preserves_order_and_skips_unknown() {
        let (corpus, ids) = corpus().await;
        let jobs = corpus
            .get_jobs(&[ids[2], Uuid::new_v4(), ids[0]])
            .await
            .unwrap();
        assert_eq!(jobs.iter().map(|j| j.id).collect::<Vec<_>>(), vec![ids[2], ids[0]]);
    }

    #[tokio::test]
    async fn test_remove() {
        let (corpus, ids) = corpus().await;
        assert!(corpus.remove(ids[0]).await);
        assert!(!corpus.remove(ids[0]).await);
        assert_eq!(corpus.count().await.unwrap(), 2);
    }
}
