//! Per-host request pacing and 429 backoff
//!
//! Every (tier, host) pair owns an independent [`RateLimiter`]. Requests are
//! handed reserved slots spaced at least `min_interval` apart, so concurrent
//! callers are delayed rather than dropped. A 429 moves the limiter to
//! `Limited(until)`; too many consecutive 429s exhaust it for a cooldown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

/// Pacing and backoff policy for one upstream host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Minimum spacing between consecutive requests to the host, in ms
    pub min_interval_ms: u64,
    /// Backoff after the first 429 when no Retry-After is given, in ms
    pub initial_backoff_ms: u64,
    /// Upper bound for any backoff, including Retry-After, in ms
    pub max_backoff_ms: u64,
    /// Consecutive 429 responses that exhaust the host
    pub max_consecutive_429: u32,
    /// How long an exhausted host rejects requests, in ms
    pub exhausted_cooldown_ms: u64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            min_interval_ms: 1000,
            initial_backoff_ms: 2000,
            max_backoff_ms: 60_000,
            max_consecutive_429: 3,
            exhausted_cooldown_ms: 600_000,
        }
    }
}

impl RateLimitPolicy {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    fn backoff_for(&self, consecutive: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = consecutive.saturating_sub(1).min(16);
        let computed = Duration::from_millis(self.initial_backoff_ms.saturating_mul(1 << exponent));
        retry_after
            .unwrap_or(computed)
            .min(Duration::from_millis(self.max_backoff_ms))
    }
}

/// Limiter state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterState {
    Ready,
    /// Backing off after a 429 until the given instant
    Limited(Instant),
    /// Too many consecutive 429s; requests fail fast until the given instant
    Exhausted(Instant),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Host exhausted by repeated rate limiting")]
pub struct LimiterExhausted;

#[derive(Debug)]
struct LimiterInner {
    state: LimiterState,
    next_slot: Option<Instant>,
    consecutive_429: u32,
}

/// Request pacer for a single upstream host
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    inner: Mutex<LimiterInner>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(LimiterInner {
                state: LimiterState::Ready,
                next_slot: None,
                consecutive_429: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LimiterInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn settle(inner: &mut LimiterInner, now: Instant) {
        match inner.state {
            LimiterState::Limited(until) if now >= until => inner.state = LimiterState::Ready,
            LimiterState::Exhausted(until) if now >= until => {
                inner.state = LimiterState::Ready;
                inner.consecutive_429 = 0;
            }
            _ => {}
        }
    }

    /// Current state, after expiring any elapsed backoff
    pub fn state(&self) -> LimiterState {
        let mut inner = self.lock();
        Self::settle(&mut inner, Instant::now());
        inner.state
    }

    /// Wait for this caller's request slot.
    ///
    /// The slot is reserved under the lock before sleeping, so no two slots
    /// are ever closer than `min_interval`, whatever the number of callers.
    pub async fn acquire(&self) -> Result<(), LimiterExhausted> {
        let slot = {
            let mut inner = self.lock();
            let now = Instant::now();
            Self::settle(&mut inner, now);

            let mut slot = now;
            match inner.state {
                LimiterState::Exhausted(_) => return Err(LimiterExhausted),
                LimiterState::Limited(until) => slot = slot.max(until),
                LimiterState::Ready => {}
            }
            if let Some(next) = inner.next_slot {
                slot = slot.max(next);
            }
            inner.next_slot = Some(slot + self.policy.min_interval());
            slot
        };

        if slot > Instant::now() {
            tracing::debug!(
                "Rate limiting: waiting {:?}",
                slot.saturating_duration_since(Instant::now())
            );
            tokio::time::sleep_until(slot).await;
        }
        Ok(())
    }

    /// Record a 429 and move to `Limited` or `Exhausted`
    pub fn on_rate_limited(&self, retry_after: Option<Duration>) -> LimiterState {
        let mut inner = self.lock();
        let now = Instant::now();
        inner.consecutive_429 += 1;

        inner.state = if inner.consecutive_429 >= self.policy.max_consecutive_429 {
            LimiterState::Exhausted(now + Duration::from_millis(self.policy.exhausted_cooldown_ms))
        } else {
            let backoff = self.policy.backoff_for(inner.consecutive_429, retry_after);
            LimiterState::Limited(now + backoff)
        };
        inner.state
    }

    /// Record a non-429 response
    pub fn on_success(&self) {
        let mut inner = self.lock();
        inner.consecutive_429 = 0;
        if let LimiterState::Limited(_) = inner.state {
            inner.state = LimiterState::Ready;
        }
    }
}

/// Registry of independent limiters keyed by scope (tier) and host
#[derive(Debug, Default)]
pub struct RateLimiters {
    limiters: Mutex<HashMap<(String, String), Arc<RateLimiter>>>,
}

impl RateLimiters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limiter for the host of `url` within `scope`, created on first use
    pub fn for_url(&self, scope: &str, url: &str, policy: &RateLimitPolicy) -> Arc<RateLimiter> {
        let host = host_of(url);
        let mut limiters = self.limiters.lock().unwrap_or_else(|e| e.into_inner());
        limiters
            .entry((scope.to_string(), host))
            .or_insert_with(|| Arc::new(RateLimiter::new(policy.clone())))
            .clone()
    }
}

/// Host component of a URL; the whole string when it does not parse
pub fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(interval_ms: u64) -> RateLimitPolicy {
        RateLimitPolicy {
            min_interval_ms: interval_ms,
            initial_backoff_ms: 100,
            max_backoff_ms: 1000,
            max_consecutive_429: 3,
            exhausted_cooldown_ms: 5000,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::new(policy(500));
        let start = Instant::now();
        limiter.acquire().await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_acquire_waits_interval() {
        let limiter = RateLimiter::new(policy(500));
        limiter.acquire().await.unwrap();
        let start = Instant::now();
        limiter.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_escalates_to_exhausted() {
        let limiter = RateLimiter::new(policy(0));

        assert!(matches!(limiter.on_rate_limited(None), LimiterState::Limited(_)));
        assert!(matches!(limiter.on_rate_limited(None), LimiterState::Limited(_)));
        assert!(matches!(limiter.on_rate_limited(None), LimiterState::Exhausted(_)));
        assert_eq!(limiter.acquire().await, Err(LimiterExhausted));

        tokio::time::advance(Duration::from_millis(5001)).await;
        assert_eq!(limiter.state(), LimiterState::Ready);
        assert!(limiter.acquire().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_limited_delays_next_acquire() {
        let limiter = RateLimiter::new(policy(0));
        limiter.on_rate_limited(Some(Duration::from_millis(300)));
        let start = Instant::now();
        limiter.acquire().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_is_capped() {
        let limiter = RateLimiter::new(policy(0));
        let state = limiter.on_rate_limited(Some(Duration::from_secs(3600)));
        match state {
            LimiterState::Limited(until) => {
                assert!(until - Instant::now() <= Duration::from_millis(1000));
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_backoff() {
        let limiter = RateLimiter::new(policy(0));
        limiter.on_rate_limited(None);
        limiter.on_rate_limited(None);
        limiter.on_success();
        assert_eq!(limiter.state(), LimiterState::Ready);
        // Counter was reset, so one more 429 is not enough to exhaust
        assert!(matches!(limiter.on_rate_limited(None), LimiterState::Limited(_)));
    }

    #[test]
    fn test_registry_separates_hosts_and_scopes() {
        let registry = RateLimiters::new();
        let p = policy(100);
        let a = registry.for_url("publisher", "https://a.example/x", &p);
        let a2 = registry.for_url("publisher", "https://A.example/y", &p);
        let b = registry.for_url("publisher", "https://b.example/x", &p);
        let other = registry.for_url("web_search", "https://a.example/x", &p);
        assert!(Arc::ptr_eq(&a, &a2));
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
