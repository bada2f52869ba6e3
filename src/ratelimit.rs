//! Per-client sliding-window rate limiting.
//!
//! Full-history sliding window: every admitted request timestamp inside the
//! trailing window is kept, so the count is exact. That trades memory for
//! precision, which is acceptable only because the quota is small and the
//! window bounded.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::types::ClientId;

/// Trailing window length in seconds.
pub const RATE_WINDOW_SECS: i64 = 30 * 60;

/// Maximum admitted requests per client within the window.
pub const RATE_QUOTA: usize = 50;

/// Every this many checks, clients whose newest hit fell out of the window
/// are dropped wholesale. Keeps the map bounded by *active* clients without
/// a background task.
const SWEEP_INTERVAL: u64 = 4096;

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Admit,
    Reject,
}

/// Sliding-window limiter keyed by client identifier.
pub struct RateLimiter {
    window: Duration,
    quota: usize,
    clients: RwLock<HashMap<ClientId, VecDeque<DateTime<Utc>>>>,
    checks: AtomicU64,
}

impl RateLimiter {
    /// Create a limiter with the fixed service-wide window and quota.
    pub fn new() -> Self {
        Self::with_limits(Duration::seconds(RATE_WINDOW_SECS), RATE_QUOTA)
    }

    /// Create a limiter with explicit limits.
    pub fn with_limits(window: Duration, quota: usize) -> Self {
        Self {
            window,
            quota,
            clients: RwLock::new(HashMap::new()),
            checks: AtomicU64::new(0),
        }
    }

    /// Admit or reject a request from `client` at instant `now`.
    ///
    /// Entries older than the window are pruned lazily; a rejected request
    /// is not recorded. The write lock spans prune+count+append, so checks
    /// for the same client are serialized and the quota cannot be exceeded
    /// by a race.
    pub async fn check(&self, client: &ClientId, now: DateTime<Utc>) -> RateDecision {
        let cutoff = now - self.window;
        let mut clients = self.clients.write().await;

        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            let before = clients.len();
            clients.retain(|_, hits| hits.back().is_some_and(|t| *t > cutoff));
            debug!(
                evicted = before - clients.len(),
                tracked = clients.len(),
                "Swept stale rate-limit clients"
            );
        }

        let hits = clients.entry(client.clone()).or_default();
        while hits.front().is_some_and(|t| *t <= cutoff) {
            hits.pop_front();
        }

        if hits.len() >= self.quota {
            warn!(client = %client, hits = hits.len(), "Rate limit exceeded");
            return RateDecision::Reject;
        }

        hits.push_back(now);
        RateDecision::Admit
    }

    /// Number of client identifiers currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.clients.read().await.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
