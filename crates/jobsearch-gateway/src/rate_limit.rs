use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;

/// Buckets untouched for this long are dropped by [`RateLimiter::purge_idle`].
pub const DEFAULT_IDLE_EXPIRY: Duration = Duration::from_secs(600);

struct Bucket {
    tokens: f64,
    last_seen: Instant,
}

/// Token bucket per peer address.
///
/// Keyed on the connection's IP so a client cannot mint fresh buckets by
/// varying request headers. Idle buckets are only dropped by `purge_idle`,
/// which the serving binary runs every `idle_expiry`.
pub struct RateLimiter {
    burst: f64,
    refill_per_sec: f64,
    idle_expiry: Duration,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
}

impl RateLimiter {
    /// `burst` requests at once, refilled at `refill_per_sec`.
    pub fn new(burst: f64, refill_per_sec: f64) -> Self {
        Self {
            burst: burst.max(1.0),
            refill_per_sec: refill_per_sec.max(0.0),
            idle_expiry: DEFAULT_IDLE_EXPIRY,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Override how long an untouched bucket is kept.
    pub fn with_idle_expiry(mut self, idle_expiry: Duration) -> Self {
        self.idle_expiry = idle_expiry;
        self
    }

    /// Idle time after which a bucket is forgotten.
    pub fn idle_expiry(&self) -> Duration {
        self.idle_expiry
    }

    /// Take one token for `peer`.
    ///
    /// On rejection returns how long until the next token is available.
    pub fn acquire(&self, peer: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(peer).or_insert(Bucket {
            tokens: self.burst,
            last_seen: now,
        });

        let elapsed = now.duration_since(bucket.last_seen).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.burst);
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }
        if self.refill_per_sec <= 0.0 {
            return Err(self.idle_expiry);
        }
        let wait = (1.0 - bucket.tokens) / self.refill_per_sec;
        Err(Duration::try_from_secs_f64(wait).unwrap_or(self.idle_expiry))
    }

    /// Drop buckets idle for at least `idle_expiry`. Returns how many went.
    pub fn purge_idle(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, b| now.duration_since(b.last_seen) < self.idle_expiry);
        before - buckets.len()
    }

    /// Number of peers with a live bucket.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().len()
    }
}
