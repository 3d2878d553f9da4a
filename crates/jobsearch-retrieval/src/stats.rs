use jobsearch_core::Layer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::orchestrator::PipelineRun;

/// Process-wide search counters.
#[derive(Debug, Default)]
pub struct SearchStats {
    searches: AtomicU64,
    fallbacks: AtomicU64,
    exhausted: AtomicU64,
    cache_hits: AtomicU64,
    errors: AtomicU64,
    suggestions: AtomicU64,
    layer_invocations: [AtomicU64; 6],
    layer_failures: [AtomicU64; 6],
}

/// Point-in-time copy of [`SearchStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Searches answered, cache hits included.
    pub searches: u64,
    /// Searches where a fallback layer contributed.
    pub fallbacks: u64,
    /// Searches with no candidates at all.
    pub exhausted: u64,
    /// Searches answered from the cache.
    pub cache_hits: u64,
    /// Searches that failed after degradation.
    pub errors: u64,
    /// Did-you-mean lookups.
    pub suggestions: u64,
    /// Keyed by layer label.
    pub layer_invocations: BTreeMap<String, u64>,
    /// Failed or timed-out layer calls, keyed by layer label.
    pub layer_failures: BTreeMap<String, u64>,
}

fn slot(layer: Layer) -> usize {
    layer as usize
}

impl SearchStats {
    /// Record a completed pipeline run.
    pub fn record_run(&self, run: &PipelineRun, fallback_used: bool) {
        self.searches.fetch_add(1, Ordering::Relaxed);
        if fallback_used {
            self.fallbacks.fetch_add(1, Ordering::Relaxed);
        }
        if run.is_exhausted() {
            self.exhausted.fetch_add(1, Ordering::Relaxed);
        }
        for batch in &run.batches {
            self.layer_invocations[slot(batch.layer)].fetch_add(1, Ordering::Relaxed);
            if batch.error.is_some() {
                self.layer_failures[slot(batch.layer)].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Count a search answered from the cache.
    pub fn record_cache_hit(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed search.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a did-you-mean lookup.
    pub fn record_suggestion(&self) {
        self.suggestions.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        let per_layer = |counters: &[AtomicU64; 6]| -> BTreeMap<String, u64> {
            Layer::ALL
                .iter()
                .map(|l| (l.label().to_string(), counters[slot(*l)].load(Ordering::Relaxed)))
                .collect()
        };
        StatsSnapshot {
            searches: self.searches.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            suggestions: self.suggestions.load(Ordering::Relaxed),
            layer_invocations: per_layer(&self.layer_invocations),
            layer_failures: per_layer(&self.layer_failures),
        }
    }
}
