use std::collections::HashMap;
use uuid::Uuid;

use crate::normalize::tokenize;

/// BM25 parameters.
const K1: f32 = 1.2;
const B: f32 = 0.75;

/// A BM25 inverted index for full-text job retrieval.
///
/// Documents are added as weighted fields; a field with weight 2 contributes
/// each of its tokens twice to the term frequency and document length.
#[derive(Debug, Clone, Default)]
pub struct Bm25Index {
    /// term -> (doc_id -> term_frequency)
    inverted_index: HashMap<String, HashMap<Uuid, f32>>,
    /// doc_id -> weighted document length
    doc_lengths: HashMap<Uuid, f32>,
    avg_doc_length: f32,
}

impl Bm25Index {
    /// Create a new, empty BM25 index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a document made of `(text, weight)` fields, replacing any prior version.
    pub fn add_document(&mut self, id: Uuid, fields: &[(&str, f32)]) {
        if self.doc_lengths.contains_key(&id) {
            self.remove_document(id);
        }

        let mut term_freq: HashMap<String, f32> = HashMap::new();
        let mut doc_len = 0.0;
        for (text, weight) in fields {
            for token in tokenize(text) {
                *term_freq.entry(token).or_insert(0.0) += weight;
                doc_len += weight;
            }
        }

        for (term, freq) in term_freq {
            self.inverted_index.entry(term).or_default().insert(id, freq);
        }
        self.doc_lengths.insert(id, doc_len);
        self.recompute_avg_doc_length();
    }

    /// Remove a document from every posting list.
    pub fn remove_document(&mut self, id: Uuid) {
        if self.doc_lengths.remove(&id).is_none() {
            return;
        }
        self.inverted_index.retain(|_, postings| {
            postings.remove(&id);
            !postings.is_empty()
        });
        self.recompute_avg_doc_length();
    }

    /// Score every document matching at least one query term.
    ///
    /// ```text
    /// score = sum over query terms of:
    ///   IDF(t) * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * dl / avgdl))
    /// IDF(t) = ln((N - df + 0.5) / (df + 0.5) + 1.0)
    /// ```
    ///
    /// `admit` is consulted before scoring so filtered-out documents never
    /// take a slot. Results are sorted by descending score, then id.
    pub fn search<F>(&self, query: &str, admit: F) -> Vec<(Uuid, f32)>
    where
        F: Fn(&Uuid) -> bool,
    {
        let doc_count = self.doc_lengths.len();
        if doc_count == 0 {
            return Vec::new();
        }

        let mut query_tokens = tokenize(query);
        query_tokens.sort();
        query_tokens.dedup();

        let n = doc_count as f32;
        let avgdl = if self.avg_doc_length > 0.0 {
            self.avg_doc_length
        } else {
            1.0
        };
        let mut scores: HashMap<Uuid, f32> = HashMap::new();

        for token in &query_tokens {
            let Some(postings) = self.inverted_index.get(token) else {
                continue;
            };
            let df = postings.len() as f32;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for (doc_id, &tf) in postings {
                if !admit(doc_id) {
                    continue;
                }
                let dl = self.doc_lengths.get(doc_id).copied().unwrap_or(0.0);
                let term_score = idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * dl / avgdl));
                *scores.entry(*doc_id).or_insert(0.0) += term_score;
            }
        }

        let mut results: Vec<(Uuid, f32)> = scores.into_iter().collect();
        results.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        results
    }

    /// Number of indexed documents.
    pub fn document_count(&self) -> usize {
        self.doc_lengths.len()
    }

    fn recompute_avg_doc_length(&mut self) {
        self.avg_doc_length = if self.doc_lengths.is_empty() {
            0.0
        } else {
            self.doc_lengths.values().sum::<f32>() / self.doc_lengths.len() as f32
        };
    }
}
