use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use leads_scraper::app::ports::{FetchAttempt, FetchPort, RateLimiterPort};
use leads_scraper::pipeline::ingestion::retry::{
    FailureKind, FetchOutcome, FetchRetryPolicy, RetrySettings, UnavailableCause,
};
use leads_scraper::pipeline::ingestion::IdentityRotator;
use tokio::time::Instant;

/// Replays a fixed script of attempts and records the identity used for each
struct ScriptedFetcher {
    script: Mutex<VecDeque<FetchAttempt>>,
    identities: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn new(script: Vec<FetchAttempt>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            identities: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.identities.lock().unwrap().len()
    }

    fn identities(&self) -> Vec<String> {
        self.identities.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchPort for ScriptedFetcher {
    async fn fetch(&self, _url: &str, identity: &str) -> FetchAttempt {
        self.identities.lock().unwrap().push(identity.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(FetchAttempt::Timeout)
    }
}

#[derive(Default)]
struct CountingLimiter {
    acquired: AtomicUsize,
}

#[async_trait]
impl RateLimiterPort for CountingLimiter {
    async fn acquire(&self) -> Duration {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Duration::ZERO
    }
}

fn policy() -> FetchRetryPolicy {
    let settings = RetrySettings {
        max_attempts: 3,
        backoff_base: 2.0,
        rate_limit_cooldown: Duration::from_secs(60),
    };
    let identities = IdentityRotator::new(vec!["ua-1".into(), "ua-2".into(), "ua-3".into()]).unwrap();
    FetchRetryPolicy::new(settings, identities)
}

const URL: &str = "https://jobs.example.com/search?q=engineer";

#[tokio::test(start_paused = true)]
async fn success_on_first_attempt() {
    let fetcher = ScriptedFetcher::new(vec![FetchAttempt::Payload("<html/>".into())]);
    let outcome = policy().fetch(&fetcher, URL).await;

    assert_eq!(
        outcome,
        FetchOutcome::Fetched {
            payload: "<html/>".into(),
            attempts: 1
        }
    );
    assert_eq!(outcome.payload(), Some("<html/>"));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_response_cools_down_then_retries() {
    let fetcher = ScriptedFetcher::new(vec![
        FetchAttempt::Status(429),
        FetchAttempt::Payload("ok".into()),
    ]);
    let start = Instant::now();

    let outcome = policy().fetch(&fetcher, URL).await;

    assert_eq!(outcome.attempts(), 2);
    assert_eq!(outcome.payload(), Some("ok"));
    assert_eq!(start.elapsed(), Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn blocked_response_rotates_identity() {
    let fetcher = ScriptedFetcher::new(vec![
        FetchAttempt::Status(403),
        FetchAttempt::Status(451),
        FetchAttempt::Payload("ok".into()),
    ]);

    let outcome = policy().fetch(&fetcher, URL).await;

    assert_eq!(outcome.attempts(), 3);
    assert_eq!(fetcher.identities(), vec!["ua-1", "ua-2", "ua-3"]);
}

#[tokio::test(start_paused = true)]
async fn not_found_is_terminal_without_retry() {
    let fetcher = ScriptedFetcher::new(vec![FetchAttempt::Status(404)]);
    let start = Instant::now();

    let outcome = policy().fetch(&fetcher, URL).await;

    assert_eq!(
        outcome,
        FetchOutcome::Unavailable {
            cause: UnavailableCause::NotFound,
            attempts: 1
        }
    );
    assert!(!outcome.is_recoverable());
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn unrecognised_status_is_terminal() {
    let fetcher = ScriptedFetcher::new(vec![FetchAttempt::Status(500)]);
    let outcome = policy().fetch(&fetcher, URL).await;

    assert_eq!(
        outcome,
        FetchOutcome::Unavailable {
            cause: UnavailableCause::UnrecognizedStatus { status: 500 },
            attempts: 1
        }
    );
    assert!(!outcome.is_recoverable());
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn timeouts_back_off_exponentially_until_exhausted() {
    let fetcher = ScriptedFetcher::new(vec![
        FetchAttempt::Timeout,
        FetchAttempt::Timeout,
        FetchAttempt::Timeout,
    ]);
    let start = Instant::now();

    let outcome = policy().fetch(&fetcher, URL).await;

    assert_eq!(
        outcome,
        FetchOutcome::Unavailable {
            cause: UnavailableCause::Exhausted {
                last_failure: FailureKind::Timeout
            },
            attempts: 3
        }
    );
    assert!(!outcome.is_recoverable());
    // 2^0 + 2^1 seconds; no sleep after the final attempt
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn persistent_rate_limiting_is_terminal() {
    let fetcher = ScriptedFetcher::new(vec![
        FetchAttempt::Status(429),
        FetchAttempt::Status(429),
        FetchAttempt::Status(429),
    ]);

    let outcome = policy().fetch(&fetcher, URL).await;

    assert_eq!(
        outcome,
        FetchOutcome::Unavailable {
            cause: UnavailableCause::Exhausted {
                last_failure: FailureKind::RateLimited
            },
            attempts: 3
        }
    );
    assert!(!outcome.is_recoverable());
}

#[tokio::test(start_paused = true)]
async fn blocked_on_every_attempt_is_unavailable() {
    let fetcher = ScriptedFetcher::new(vec![
        FetchAttempt::Status(403),
        FetchAttempt::Status(403),
        FetchAttempt::Status(403),
    ]);
    let start = Instant::now();

    let outcome = policy().fetch(&fetcher, URL).await;

    assert_eq!(
        outcome,
        FetchOutcome::Unavailable {
            cause: UnavailableCause::Exhausted {
                last_failure: FailureKind::Blocked { status: 403 }
            },
            attempts: 3
        }
    );
    assert!(!outcome.is_recoverable());
    assert_eq!(fetcher.identities(), vec!["ua-1", "ua-2", "ua-3"]);
    // Backoff after the first two blocks only
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn empty_success_is_recoverable() {
    let fetcher = ScriptedFetcher::new(vec![FetchAttempt::Payload("  \n".into())]);
    let outcome = policy().fetch(&fetcher, URL).await;

    assert_eq!(outcome, FetchOutcome::Empty { attempts: 1 });
    assert!(outcome.is_recoverable());
    assert_eq!(outcome.payload(), None);
}

#[tokio::test(start_paused = true)]
async fn transport_error_is_retried() {
    let fetcher = ScriptedFetcher::new(vec![
        FetchAttempt::Transport("connection reset".into()),
        FetchAttempt::Payload("ok".into()),
    ]);
    let outcome = policy().fetch(&fetcher, URL).await;
    assert_eq!(outcome.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn every_attempt_passes_through_the_rate_limiter() {
    let limiter = Arc::new(CountingLimiter::default());
    let fetcher = ScriptedFetcher::new(vec![
        FetchAttempt::Timeout,
        FetchAttempt::Status(403),
        FetchAttempt::Payload("ok".into()),
    ]);

    let mut policy = policy().with_rate_limiter(limiter.clone());
    let outcome = policy.fetch(&fetcher, URL).await;

    assert_eq!(outcome.attempts(), 3);
    assert_eq!(limiter.acquired.load(Ordering::SeqCst), 3);
}
