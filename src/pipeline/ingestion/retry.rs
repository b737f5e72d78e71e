use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::app::ports::{FetchAttempt, FetchPort, RateLimiterPort};
use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::pipeline::ingestion::identity::IdentityRotator;

#[derive(Clone, Debug)]
pub struct RetrySettings {
    /// Total attempts per fetch, including the first
    pub max_attempts: u32,
    /// Transient failures back off `backoff_base^attempt` seconds (attempt counted from 0)
    pub backoff_base: f64,
    /// Fixed pause after an explicit rate-limit response
    pub rate_limit_cooldown: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetrySettings {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base,
            rate_limit_cooldown: Duration::from_secs_f64(config.rate_limit_cooldown_seconds.max(0.0)),
        }
    }
}

impl RetrySettings {
    pub fn backoff(&self, attempt: u32) -> Duration {
        let secs = self.backoff_base.powi(attempt as i32);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// How a remote source answered, by status code
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    RateLimited,
    Blocked,
    NotFound,
    Unrecognized,
}

impl StatusClass {
    pub fn of(status: u16) -> Self {
        match status {
            200 => StatusClass::Success,
            429 => StatusClass::RateLimited,
            403 | 451 => StatusClass::Blocked,
            404 => StatusClass::NotFound,
            _ => StatusClass::Unrecognized,
        }
    }
}

/// The failure that consumed the last attempt of an exhausted fetch
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    Blocked { status: u16 },
    Timeout,
    Transport { message: String },
}

/// Why a fetch ended without a payload and will not succeed by retrying
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnavailableCause {
    NotFound,
    UnrecognizedStatus { status: u16 },
    /// Every attempt failed; carries the failure that consumed the last one
    Exhausted { last_failure: FailureKind },
}

impl fmt::Display for UnavailableCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableCause::NotFound => write!(f, "not found"),
            UnavailableCause::UnrecognizedStatus { status } => write!(f, "status {}", status),
            UnavailableCause::Exhausted { last_failure } => {
                write!(f, "attempts exhausted, last failure {:?}", last_failure)
            }
        }
    }
}

/// Result of a fetch under the retry policy. Never an error.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Fetched { payload: String, attempts: u32 },
    /// The source answered successfully with no body; a later run may find content
    Empty { attempts: u32 },
    /// Terminal: not-found, an unrecognised status, or the attempt budget spent
    Unavailable { cause: UnavailableCause, attempts: u32 },
}

impl FetchOutcome {
    pub fn payload(&self) -> Option<&str> {
        match self {
            FetchOutcome::Fetched { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            FetchOutcome::Fetched { attempts, .. }
            | FetchOutcome::Empty { attempts }
            | FetchOutcome::Unavailable { attempts, .. } => *attempts,
        }
    }

    /// Whether an empty result may turn into content on a later run
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FetchOutcome::Empty { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Fetched { .. } => "fetched",
            FetchOutcome::Empty { .. } => "empty",
            FetchOutcome::Unavailable { .. } => "unavailable",
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Fetched { payload, attempts } => {
                write!(f, "fetched {} bytes in {} attempt(s)", payload.len(), attempts)
            }
            FetchOutcome::Empty { attempts } => {
                write!(f, "empty response after {} attempt(s)", attempts)
            }
            FetchOutcome::Unavailable { cause, attempts } => {
                write!(f, "unavailable ({}) after {} attempt(s)", cause, attempts)
            }
        }
    }
}

/// Wraps a caller-supplied fetch with bounded retries, status-driven branching and
/// identity rotation. Every attempt passes through the shared rate limiter when one is set.
pub struct FetchRetryPolicy {
    settings: RetrySettings,
    identities: IdentityRotator,
    rate_limiter: Option<Arc<dyn RateLimiterPort>>,
}

impl FetchRetryPolicy {
    pub fn new(settings: RetrySettings, identities: IdentityRotator) -> Self {
        Self {
            settings,
            identities,
            rate_limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiterPort>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    pub async fn fetch(&mut self, fetcher: &dyn FetchPort, url: &str) -> FetchOutcome {
        let outcome = self.run(fetcher, url).await;
        metrics::fetch::outcome(outcome.label());
        outcome
    }

    async fn run(&mut self, fetcher: &dyn FetchPort, url: &str) -> FetchOutcome {
        let max_attempts = self.settings.max_attempts;
        let mut identity = self.identities.next().to_string();
        let mut last_failure = FailureKind::Timeout;

        for attempt in 0..max_attempts {
            let attempts = attempt + 1;
            let attempts_remain = attempts < max_attempts;

            if let Some(rate_limiter) = &self.rate_limiter {
                let waited = rate_limiter.acquire().await;
                debug!(wait_secs = waited.as_secs_f64(), "Rate limiter wait");
            }

            debug!(url, attempt = attempts, "Fetching URL");
            match fetcher.fetch(url, &identity).await {
                FetchAttempt::Payload(payload) if payload.trim().is_empty() => {
                    metrics::fetch::attempt("payload");
                    warn!(url, "Empty response body");
                    return FetchOutcome::Empty { attempts };
                }
                FetchAttempt::Payload(payload) => {
                    metrics::fetch::attempt("payload");
                    debug!(url, "Successfully fetched");
                    return FetchOutcome::Fetched { payload, attempts };
                }
                FetchAttempt::Status(status) => {
                    metrics::fetch::attempt("status");
                    match StatusClass::of(status) {
                        StatusClass::Success => {
                            return FetchOutcome::Empty { attempts };
                        }
                        StatusClass::RateLimited => {
                            last_failure = FailureKind::RateLimited;
                            if attempts_remain {
                                warn!(
                                    url,
                                    cooldown_secs = self.settings.rate_limit_cooldown.as_secs_f64(),
                                    "Rate limit detected (429), cooling down"
                                );
                                tokio::time::sleep(self.settings.rate_limit_cooldown).await;
                            }
                        }
                        StatusClass::Blocked => {
                            error!(url, status, "Blocked by remote source");
                            last_failure = FailureKind::Blocked { status };
                            if !attempts_remain {
                                break;
                            }
                            identity = self.identities.next().to_string();
                            metrics::fetch::identity_rotated();
                            tokio::time::sleep(self.settings.backoff(attempt)).await;
                        }
                        StatusClass::NotFound => {
                            warn!(url, "Page not found (404)");
                            return FetchOutcome::Unavailable {
                                cause: UnavailableCause::NotFound,
                                attempts,
                            };
                        }
                        StatusClass::Unrecognized => {
                            warn!(url, status, "Unexpected status code");
                            return FetchOutcome::Unavailable {
                                cause: UnavailableCause::UnrecognizedStatus { status },
                                attempts,
                            };
                        }
                    }
                }
                FetchAttempt::Timeout => {
                    metrics::fetch::attempt("timeout");
                    error!(url, attempt = attempts, "Timeout fetching URL");
                    last_failure = FailureKind::Timeout;
                    if attempts_remain {
                        tokio::time::sleep(self.settings.backoff(attempt)).await;
                    }
                }
                FetchAttempt::Transport(message) => {
                    metrics::fetch::attempt("transport");
                    error!(url, attempt = attempts, error = %message, "Request failed");
                    last_failure = FailureKind::Transport { message };
                    if attempts_remain {
                        tokio::time::sleep(self.settings.backoff(attempt)).await;
                    }
                }
            }
        }

        error!(url, attempts = max_attempts, "Failed to fetch after all attempts");
        FetchOutcome::Unavailable {
            cause: UnavailableCause::Exhausted { last_failure },
            attempts: max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(StatusClass::of(200), StatusClass::Success);
        assert_eq!(StatusClass::of(429), StatusClass::RateLimited);
        assert_eq!(StatusClass::of(403), StatusClass::Blocked);
        assert_eq!(StatusClass::of(451), StatusClass::Blocked);
        assert_eq!(StatusClass::of(404), StatusClass::NotFound);
        assert_eq!(StatusClass::of(500), StatusClass::Unrecognized);
        assert_eq!(StatusClass::of(301), StatusClass::Unrecognized);
    }

    #[test]
    fn test_exponential_backoff() {
        let settings = RetrySettings {
            max_attempts: 4,
            backoff_base: 2.0,
            rate_limit_cooldown: Duration::from_secs(60),
        };
        assert_eq!(settings.backoff(0), Duration::from_secs(1));
        assert_eq!(settings.backoff(1), Duration::from_secs(2));
        assert_eq!(settings.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_saturates_instead_of_panicking() {
        let settings = RetrySettings {
            max_attempts: 3,
            backoff_base: 1e300,
            rate_limit_cooldown: Duration::ZERO,
        };
        assert_eq!(settings.backoff(5), Duration::MAX);
    }
}
