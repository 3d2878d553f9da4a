use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// One retrieval strategy in the escalation cascade, in priority order.
///
/// The derived `Ord` follows declaration order, which is the cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Layer {
    /// Exact and prefix title/company match.
    L1,
    /// Full-text relevance search.
    L2,
    /// Trigram similarity on title and company.
    L3,
    /// Embedding cosine similarity.
    L4,
    /// Any shared content token.
    L5,
    /// Newest filter-matching jobs, query ignored.
    L6,
}

impl Layer {
    /// All layers in cascade order.
    pub const ALL: [Layer; 6] = [Layer::L1, Layer::L2, Layer::L3, Layer::L4, Layer::L5, Layer::L6];

    /// Short label used on the wire (`"L1"` .. `"L6"`).
    pub fn label(self) -> &'static str {
        match self {
            Layer::L1 => "L1",
            Layer::L2 => "L2",
            Layer::L3 => "L3",
            Layer::L4 => "L4",
            Layer::L5 => "L5",
            Layer::L6 => "L6",
        }
    }

    /// Strategy name, for logs.
    pub fn strategy(self) -> &'static str {
        match self {
            Layer::L1 => "exact_prefix",
            Layer::L2 => "full_text",
            Layer::L3 => "fuzzy",
            Layer::L4 => "semantic",
            Layer::L5 => "broad_token",
            Layer::L6 => "recency",
        }
    }

    /// Layers beyond L1-L2 count as fallback when they contribute.
    pub fn is_fallback(self) -> bool {
        !matches!(self, Layer::L1 | Layer::L2)
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A job tentatively matched by one layer. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Matched job.
    pub job_id: Uuid,
    /// Layer-local score.
    pub raw_score: f32,
    /// Layer that produced the match.
    pub source_layer: Layer,
    /// Posting time, carried along for the ranker's tie-break.
    pub posted_at: DateTime<Utc>,
}

/// One entry per distinct job after merging all layer batches.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResult {
    /// Matched job.
    pub job_id: Uuid,
    /// Max layer score plus the corroboration bonus.
    pub combined_score: f32,
    /// Every layer that matched the job.
    pub matched_layers: BTreeSet<Layer>,
    /// Posting time, used as the first tie-breaker.
    pub posted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_cascade() {
        let mut shuffled = vec![Layer::L4, Layer::L1, Layer::L6, Layer::L2];
        shuffled.sort();
        assert_eq!(shuffled, vec![Layer::L1, Layer::L2, Layer::L4, Layer::L6]);
    }

    #[test]
    fn test_fallback_layers() {
        let fallback: Vec<Layer> = Layer::ALL.into_iter().filter(|l| l.is_fallback()).collect();
        assert_eq!(fallback, vec![Layer::L3, Layer::L4, Layer::L5, Layer::L6]);
    }

    #[test]
    fn test_label_and_display_agree() {
        for layer in Layer::ALL {
            assert_eq!(layer.to_string(), layer.label());
        }
    }
}
