use jobsearch_core::SearchFilters;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::config::CacheConfig;

/// Identity of a cacheable search response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Normalized query text.
    pub normalized: String,
    /// Filters of the request.
    pub filters: SearchFilters,
    /// Requested page.
    pub page: usize,
    /// Clamped page size.
    pub limit: usize,
    /// Whether the semantic layer was allowed.
    pub semantic: bool,
}

struct Slot<V> {
    inserted: Instant,
    /// Completion time and value; empty while the first computation runs.
    cell: OnceCell<(Instant, V)>,
}

impl<V> Slot<V> {
    fn new(now: Instant) -> Self {
        Self {
            inserted: now,
            cell: OnceCell::new(),
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.cell
            .get()
            .is_some_and(|(created, _)| now.saturating_duration_since(*created) >= ttl)
    }
}

/// Short-lived response cache with single-flight computation.
///
/// Concurrent callers for the same key share one computation. Entries expire
/// exactly `ttl` after they were computed and are never served afterwards.
/// Failed computations are not stored.
pub struct ResponseCache<K, V> {
    entries: Mutex<HashMap<K, Arc<Slot<V>>>>,
    ttl: Duration,
    capacity: usize,
}

impl<K, V> ResponseCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Cache entries for `ttl`, holding at most `capacity` keys.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Build from `[cache]` settings.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.capacity)
    }

    /// Return the cached value for `key`, or run `compute` to produce it.
    ///
    /// The flag is true when the value came from the cache.
    pub async fn get_or_try_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<(V, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);
        let mut fresh = false;
        let fresh_flag = &mut fresh;
        let (_, value) = slot
            .cell
            .get_or_try_init(|| async move {
                *fresh_flag = true;
                let value = compute().await?;
                Ok::<_, E>((Instant::now(), value))
            })
            .await?;
        Ok((value.clone(), !fresh))
    }

    /// Number of stored entries, including ones still computing.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, slot| !slot.is_expired(now, self.ttl));
        before - entries.len()
    }

    fn slot(&self, key: K) -> Arc<Slot<V>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if entries
            .get(&key)
            .is_some_and(|slot| slot.is_expired(now, self.ttl))
        {
            entries.remove(&key);
        }
        if let Some(slot) = entries.get(&key) {
            return slot.clone();
        }

        if entries.len() >= self.capacity {
            entries.retain(|_, slot| !slot.is_expired(now, self.ttl));
        }
        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, slot)| slot.inserted)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        let slot = Arc::new(Slot::new(now));
        entries.insert(key, slot.clone());
        slot
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Cache = ResponseCache<String, u32>;

    async fn compute_ok(calls: &AtomicUsize, value: u32) -> Result<u32, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn test_second_call_is_a_hit() {
        let cache = Cache::new(Duration::from_secs(30), 8);
        let calls = AtomicUsize::new(0);

        let (v, hit) = cache
            .get_or_try_compute("k".into(), || compute_ok(&calls, 7))
            .await
            .unwrap();
        assert_eq!((v, hit), (7, false));

        let (v, hit) = cache
            .get_or_try_compute("k".into(), || compute_ok(&calls, 9))
            .await
            .unwrap();
        assert_eq!((v, hit), (7, true));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_is_a_hard_expiry() {
        let cache = Cache::new(Duration::from_secs(30), 8);
        let calls = AtomicUsize::new(0);

        cache
            .get_or_try_compute("k".into(), || compute_ok(&calls, 1))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        let (v, hit) = cache
            .get_or_try_compute("k".into(), || compute_ok(&calls, 2))
            .await
            .unwrap();
        assert_eq!((v, hit), (2, false));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_computation() {
        let cache = Cache::new(Duration::from_secs(30), 8);
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let slow = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, String>(5)
        };

        let (a, b) = tokio::join!(
            cache.get_or_try_compute("k".into(), slow),
            cache.get_or_try_compute("k".into(), slow),
        );
        assert_eq!(a.unwrap().0, 5);
        assert_eq!(b.unwrap().0, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let cache = Cache::new(Duration::from_secs(30), 8);
        let err = cache
            .get_or_try_compute("k".into(), || async { Err::<u32, _>("down".to_string()) })
            .await;
        assert!(err.is_err());

        let calls = AtomicUsize::new(0);
        let (v, hit) = cache
            .get_or_try_compute("k".into(), || compute_ok(&calls, 3))
            .await
            .unwrap();
        assert_eq!((v, hit), (3, false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest() {
        let cache = Cache::new(Duration::from_secs(30), 2);
        let calls = AtomicUsize::new(0);
        for (i, key) in ["a", "b", "c"].into_iter().enumerate() {
            cache
                .get_or_try_compute(key.into(), || compute_ok(&calls, i as u32))
                .await
                .unwrap();
            tokio::time::advance(Duration::from_millis(10)).await;
        }
        assert_eq!(cache.len(), 2);

        let (_, hit) = cache
            .get_or_try_compute("a".into(), || compute_ok(&calls, 0))
            .await
            .unwrap();
        assert!(!hit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = Cache::new(Duration::from_secs(1), 8);
        let calls = AtomicUsize::new(0);
        cache
            .get_or_try_compute("a".into(), || compute_ok(&calls, 1))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }
}
