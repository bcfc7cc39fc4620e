//! Fixed-window request rate limiting.
//!
//! Each client key gets a counter and a window end. The first request after
//! the window ends replaces the entry with a fresh window; inside a window
//! requests are allowed until the counter reaches the limit.
//!
//! # Characteristics
//!
//! - Windows reset at fixed boundaries, so a burst straddling a boundary can
//!   see up to `2 × limit` requests accepted in a short span.
//! - State is in-memory and per process. Several processes each enforce
//!   their own limit; a restart forgets every counter.
//! - Keys come from client-supplied headers (see [`client_key`]), so the
//!   limit is best-effort flood control rather than a security boundary.
//!
//! [`client_key`]: super::client_key

use crate::metrics;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Default sweep period for expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

impl RateLimitEntry {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: now + window,
        }
    }
}

/// Thread-safe fixed-window counter store.
///
/// Built once at startup and shared by `Arc`. The check-then-increment for a
/// key runs while holding that key's shard lock, so concurrent requests with
/// the same key cannot both take the last slot.
#[derive(Debug, Default)]
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `key` may make another request.
    ///
    /// Returns `true` if allowed, `false` if rate limited. The stored key is
    /// `key` combined with the window length, so different windows for the
    /// same client never share a counter.
    pub fn check(&self, key: &str, limit: u32, window: Duration) -> bool {
        let now = Instant::now();
        let store_key = format!("{key}:{}", window.as_millis());

        match self.entries.entry(store_key) {
            Entry::Vacant(vacant) => {
                vacant.insert(RateLimitEntry::fresh(now, window));
                true
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.reset_at < now {
                    *entry = RateLimitEntry::fresh(now, window);
                    return true;
                }
                if entry.count >= limit {
                    debug!(key = %key, limit, "request rate limit exceeded");
                    return false;
                }
                entry.count += 1;
                true
            }
        }
    }

    /// Drop every entry whose window has already ended.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.reset_at >= now);
        let remaining = self.entries.len();
        metrics::set_rate_limit_entries(remaining);

        let removed = before.saturating_sub(remaining);
        if removed > 0 {
            debug!(removed, remaining, "swept expired rate limit entries");
        }
        removed
    }

    /// Spawn the periodic sweep task.
    ///
    /// The first sweep happens one `period` after the call. Abort the
    /// returned handle on shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                limiter.sweep();
            }
        })
    }

    /// Number of live entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
