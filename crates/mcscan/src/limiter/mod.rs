//! Global and per-host token buckets gating connection attempts (§4.5).
//!
//! The workspace has long depended on `governor` for this without ever
//! wiring it to working code; this module is the first thing in the repo
//! that actually drives it.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use governor::clock::DefaultClock;
use governor::{Quota, RateLimiter as GovernorLimiter};
use tokio::time::Instant;
use tracing::debug;

use mcscan_config::LogType;

type DirectLimiter = GovernorLimiter<governor::state::direct::NotKeyed, governor::state::InMemoryState, DefaultClock>;

/// Couples a global rate limit with an independent per-host limit. Callers
/// acquire global capacity first, then per-host capacity; either can time
/// the attempt out against the probe's remaining deadline.
///
/// Per-host buckets are plain direct limiters kept in a `DashMap`, the same
/// lazily-populated-entry shape `WorkerPool` uses for its per-host
/// semaphores, rather than `governor`'s own keyed `DashMapStateStore` — that
/// store only exposes `retain_recent`, which prunes on the quota's own
/// replenishment window, not the explicit idle window this module needs.
pub struct RateLimiterPair {
    global: DirectLimiter,
    per_host_rate: u32,
    per_host_burst: u32,
    per_host: DashMap<IpAddr, (Arc<DirectLimiter>, Instant)>,
    eviction_age: Duration,
}

fn quota(per_second: u32, burst: u32) -> Quota {
    let rate = NonZeroU32::new(per_second.max(1)).expect("clamped to at least 1");
    let burst = NonZeroU32::new(burst.max(1)).expect("clamped to at least 1");
    Quota::per_second(rate).allow_burst(burst)
}

impl RateLimiterPair {
    /// `global_rate` mirrors `scanner.rate_limit`; `per_host_rate` and
    /// `burst` come from the concurrency/advanced sections a caller has
    /// already resolved into simple numbers.
    pub fn new(global_rate: u32, per_host_rate: u32, per_host_burst: u32) -> Self {
        Self {
            global: GovernorLimiter::direct(quota(global_rate, global_rate)),
            per_host_rate,
            per_host_burst,
            per_host: DashMap::new(),
            eviction_age: Duration::from_secs(300),
        }
    }

    /// Waits for both a global and a per-host token, aborting with `None`
    /// if `deadline` elapses first. `addr` keys the per-host bucket.
    pub async fn acquire(&self, addr: IpAddr, deadline: Duration) -> bool {
        if tokio::time::timeout(deadline, self.global.until_ready()).await.is_err() {
            debug!(log_type = LogType::RateLimiter.as_str(), "global rate limit timed out");
            return false;
        }

        let limiter = {
            let mut entry = self.per_host.entry(addr).or_insert_with(|| {
                (
                    Arc::new(GovernorLimiter::direct(quota(self.per_host_rate, self.per_host_burst))),
                    Instant::now(),
                )
            });
            entry.1 = Instant::now();
            Arc::clone(&entry.0)
        };

        match tokio::time::timeout(deadline, limiter.until_ready()).await {
            Ok(()) => true,
            Err(_) => {
                debug!(log_type = LogType::RateLimiter.as_str(), %addr, "per-host rate limit timed out");
                false
            }
        }
    }

    /// Drops per-host buckets whose last acquire was longer than the
    /// eviction window ago, so a long scan doesn't accumulate one entry
    /// per distinct host forever.
    pub fn evict_idle_hosts(&self) {
        let now = Instant::now();
        let eviction_age = self.eviction_age;
        self.per_host.retain(|_, (_, last_seen)| now.duration_since(*last_seen) < eviction_age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test(start_paused = true)]
    async fn acquires_immediately_within_burst() {
        let pair = RateLimiterPair::new(100, 100, 5);
        let addr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1));
        assert!(pair.acquire(addr, Duration::from_millis(50)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_hosts_have_independent_buckets() {
        let pair = RateLimiterPair::new(1000, 1, 1);
        let a = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1));
        let b = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 2));
        assert!(pair.acquire(a, Duration::from_millis(10)).await);
        assert!(pair.acquire(b, Duration::from_millis(10)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_hosts_idle_past_the_eviction_window() {
        let pair = RateLimiterPair::new(1000, 1000, 1000);
        let addr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));
        assert!(pair.acquire(addr, Duration::from_millis(10)).await);
        assert_eq!(pair.per_host.len(), 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        pair.evict_idle_hosts();
        assert_eq!(pair.per_host.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn recently_used_hosts_survive_eviction() {
        let pair = RateLimiterPair::new(1000, 1000, 1000);
        let addr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 10));
        assert!(pair.acquire(addr, Duration::from_millis(10)).await);

        tokio::time::advance(Duration::from_secs(60)).await;
        pair.evict_idle_hosts();
        assert_eq!(pair.per_host.len(), 1);
    }
}
