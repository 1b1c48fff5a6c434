//! Health gating for candidate releases.
//!
//! Health is positive only on an explicit "up" signal in the status body,
//! not merely a reachable process. Request-level failures (connection
//! refused, timeout) count as "not yet healthy"; only deadline exhaustion
//! is a hard failure. All waits go through `tokio::time`, so the poll is
//! cancelled when the owning deployment task is aborted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// One GET against the status endpoint, returning the raw body.
    async fn status_body(&self, url: &str) -> Result<String>;
}

pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(request_timeout: Duration) -> Self {
        // A probe without the per-request timeout could hang a poll
        // iteration; fail loudly rather than fall back to a default client.
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("failed to construct HTTP client");
        Self { client }
    }
}

#[async_trait]
impl StatusProbe for HttpProbe {
    async fn status_body(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        Ok(response.text().await?)
    }
}

pub struct HealthChecker {
    probe: Arc<dyn StatusProbe>,
    marker: String,
}

impl HealthChecker {
    pub fn new(probe: Arc<dyn StatusProbe>, marker: impl Into<String>) -> Self {
        Self {
            probe,
            marker: marker.into(),
        }
    }

    /// Poll until the body carries the positive marker or `deadline`
    /// expires. Returns no later than one `interval` past the deadline.
    pub async fn poll(&self, url: &str, interval: Duration, deadline: Duration) -> bool {
        let started = tokio::time::Instant::now();

        loop {
            match self.probe.status_body(url).await {
                Ok(body) if body.contains(&self.marker) => {
                    debug!(url = %url, "Health check passed");
                    return true;
                }
                Ok(_) => debug!(url = %url, "Status endpoint reachable but not up yet"),
                Err(err) => debug!(url = %url, error = %err, "Status endpoint not reachable yet"),
            }

            if started.elapsed() >= deadline {
                return false;
            }
            tokio::time::sleep(interval).await;
        }
    }
}
