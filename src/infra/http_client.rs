use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT};

use crate::app::ports::{FetchAttempt, FetchPort};
use crate::error::Result;

/// `FetchPort` over a shared reqwest client; one call is one attempt
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .deflate(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetchPort for ReqwestFetcher {
    async fn fetch(&self, url: &str, identity: &str) -> FetchAttempt {
        tracing::debug!("HTTP GET request to: {}", url);
        let resp = match self
            .client
            .get(url)
            .header(USER_AGENT, identity)
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(ACCEPT_ENCODING, "gzip, deflate")
            .header(CONNECTION, "keep-alive")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return FetchAttempt::Timeout,
            Err(e) => return FetchAttempt::Transport(e.to_string()),
        };

        let status = resp.status().as_u16();
        if status != 200 {
            return FetchAttempt::Status(status);
        }

        match resp.text().await {
            Ok(body) => {
                tracing::debug!("HTTP response: status={}, size={} bytes", status, body.len());
                FetchAttempt::Payload(body)
            }
            Err(e) if e.is_timeout() => FetchAttempt::Timeout,
            Err(e) => FetchAttempt::Transport(e.to_string()),
        }
    }
}
