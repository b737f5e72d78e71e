use std::time::Duration;

use async_trait::async_trait;

use crate::app::ports::RateLimiterPort;
use crate::pipeline::ingestion::rate_limiter::RateLimiter;

pub struct RateLimiterAdapter(pub RateLimiter);

#[async_trait]
impl RateLimiterPort for RateLimiterAdapter {
    async fn acquire(&self) -> Duration {
        self.0.wait_if_needed().await
    }
}
