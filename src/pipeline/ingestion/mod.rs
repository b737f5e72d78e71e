// Pipeline ingestion: client identities, rate limiting and fetch retries

pub mod identity;
pub mod rate_limiter;
pub mod retry;

pub use identity::IdentityRotator;
pub use rate_limiter::{RateLimiter, RateLimiterStatus};
pub use retry::{FetchOutcome, FetchRetryPolicy, RetrySettings, UnavailableCause};
