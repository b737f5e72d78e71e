use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::config::RateLimitConfig;
use crate::constants::{RATE_LIMIT_POLL_INTERVAL_MS, SECONDS_PER_HOUR};
use crate::observability::metrics;

#[derive(Clone, Debug)]
pub struct Limits {
    /// Bucket capacity; refilled continuously at `max_requests_per_hour / 3600` tokens/s
    pub max_requests_per_hour: u32,
    /// Jittered spacing between consecutive grants is drawn from `[min_delay, max_delay]`
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl From<&RateLimitConfig> for Limits {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            max_requests_per_hour: config.max_requests_per_hour,
            min_delay: Duration::from_secs_f64(config.min_delay_seconds.max(0.0)),
            max_delay: Duration::from_secs_f64(config.max_delay_seconds.max(0.0)),
        }
    }
}

/// Read-only view of a limiter for observability
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RateLimiterStatus {
    pub tokens_available: u32,
    pub max_tokens: u32,
    pub refill_rate_per_second: f64,
}

/// Dual throttle: an hourly token bucket plus jittered minimum spacing between grants.
///
/// Clones share one bucket. Concurrent callers are admitted one at a time in FIFO order,
/// and each grant's spacing is measured from the previous grant of the same bucket.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    limits: Limits,
    refill_rate: f64,
    // serialises refill + consume + spacing across callers; tokio's mutex is fair
    admission: tokio::sync::Mutex<()>,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
    last_grant: Option<Instant>,
}

impl BucketState {
    fn refilled_tokens(&self, now: Instant, capacity: f64, refill_rate: f64) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        (self.tokens + elapsed * refill_rate).min(capacity)
    }

    fn refill(&mut self, now: Instant, capacity: f64, refill_rate: f64) {
        self.tokens = self.refilled_tokens(now, capacity, refill_rate);
        self.last_refill = now;
    }
}

impl RateLimiter {
    pub fn new(limits: Limits) -> Self {
        let capacity = limits.max_requests_per_hour as f64;
        let refill_rate = capacity / SECONDS_PER_HOUR;
        Self {
            inner: Arc::new(Inner {
                limits,
                refill_rate,
                admission: tokio::sync::Mutex::new(()),
                state: Mutex::new(BucketState {
                    tokens: capacity,
                    last_refill: Instant::now(),
                    last_grant: None,
                }),
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Limits::from(config))
    }

    fn capacity(&self) -> f64 {
        self.inner.limits.max_requests_per_hour as f64
    }

    fn state(&self) -> MutexGuard<'_, BucketState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn draw_spacing(&self) -> Duration {
        let min = self.inner.limits.min_delay.as_secs_f64();
        let max = self.inner.limits.max_delay.as_secs_f64().max(min);
        Duration::from_secs_f64(rand::thread_rng().gen_range(min..=max))
    }

    /// Wait until a request may be sent. Returns the total time spent waiting.
    pub async fn wait_if_needed(&self) -> Duration {
        let start = Instant::now();
        let _turn = self.inner.admission.lock().await;

        // Token bucket: refill lazily and poll until a whole token is available
        loop {
            {
                let mut state = self.state();
                state.refill(Instant::now(), self.capacity(), self.inner.refill_rate);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(RATE_LIMIT_POLL_INTERVAL_MS)).await;
        }

        // Jittered spacing since the previous grant
        let required = self.draw_spacing();
        let last_grant = self.state().last_grant;
        if let Some(last) = last_grant {
            let elapsed = Instant::now().saturating_duration_since(last);
            if elapsed < required {
                tokio::time::sleep(required - elapsed).await;
            }
        }

        self.state().last_grant = Some(Instant::now());

        let waited = start.elapsed();
        debug!(wait_secs = waited.as_secs_f64(), "Rate limiter granted request");
        metrics::rate_limiter::grant(waited.as_secs_f64());
        waited
    }

    /// Snapshot of the bucket; the refill is computed inline and not stored
    pub fn get_status(&self) -> RateLimiterStatus {
        let tokens = self.available_tokens();
        RateLimiterStatus {
            tokens_available: tokens.floor() as u32,
            max_tokens: self.inner.limits.max_requests_per_hour,
            refill_rate_per_second: self.inner.refill_rate,
        }
    }

    /// Fractional tokens available right now, without mutating the bucket
    pub fn available_tokens(&self) -> f64 {
        self.state()
            .refilled_tokens(Instant::now(), self.capacity(), self.inner.refill_rate)
    }

    /// Restore full capacity and forget the previous grant
    pub fn reset(&self) {
        let mut state = self.state();
        state.tokens = self.capacity();
        state.last_refill = Instant::now();
        state.last_grant = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_hour: u32, min_secs: f64, max_secs: f64) -> RateLimiter {
        RateLimiter::new(Limits {
            max_requests_per_hour: per_hour,
            min_delay: Duration::from_secs_f64(min_secs),
            max_delay: Duration::from_secs_f64(max_secs),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_is_immediate() {
        let rl = limiter(10, 3.0, 8.0);
        let waited = rl.wait_if_needed().await;
        assert_eq!(waited, Duration::ZERO);
        assert_eq!(rl.get_status().tokens_available, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_is_enforced_between_grants() {
        let rl = limiter(100, 2.0, 2.0);
        rl.wait_if_needed().await;
        let waited = rl.wait_if_needed().await;
        assert!(waited >= Duration::from_secs(2));
        assert!(waited < Duration::from_millis(2100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_counts_time_already_elapsed() {
        let rl = limiter(100, 2.0, 2.0);
        rl.wait_if_needed().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        let waited = rl.wait_if_needed().await;
        assert_eq!(waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_does_not_consume_or_store_refill() {
        let rl = limiter(3600, 0.0, 0.0);
        rl.wait_if_needed().await;
        rl.wait_if_needed().await;
        assert_eq!(rl.get_status().tokens_available, 3598);
        tokio::time::sleep(Duration::from_secs(1)).await;
        let first = rl.get_status();
        let second = rl.get_status();
        assert_eq!(first, second);
        assert_eq!(first.tokens_available, 3599);
        assert_eq!(first.max_tokens, 3600);
        assert!((first.refill_rate_per_second - 1.0).abs() < 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_never_exceed_capacity() {
        let rl = limiter(5, 0.0, 0.0);
        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert!(rl.available_tokens() <= 5.0);
        assert_eq!(rl.get_status().tokens_available, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restores_capacity() {
        let rl = limiter(2, 0.0, 0.0);
        rl.wait_if_needed().await;
        rl.wait_if_needed().await;
        assert_eq!(rl.get_status().tokens_available, 0);
        rl.reset();
        assert_eq!(rl.get_status().tokens_available, 2);
        assert_eq!(rl.wait_if_needed().await, Duration::ZERO);
    }
}
