use crate::config::{Settings, DEFAULT_FEED_URL};
use anyhow::{Context, Result};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;

/// External collaborator that yields the full bulk feed text or fails the
/// run. Retry policy lives behind this boundary, not in the core.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_feed(&self) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    http: reqwest::Client,
    url: String,
    retries: u32,
}

impl HttpFeedFetcher {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = settings
            .feed_url
            .clone()
            .unwrap_or_else(|| DEFAULT_FEED_URL.to_string());

        let timeout_secs = std::env::var("FEED_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("FEED_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build feed http client")?;

        Ok(Self { http, url, retries })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_once(&self) -> Result<String> {
        let res = self
            .http
            .get(self.url.as_str())
            .send()
            .await
            .context("feed request failed")?;

        let status = res.status();
        let body = res.text().await.context("failed to read feed response")?;

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            anyhow::bail!("feed HTTP {status}: {snippet}");
        }

        Ok(body)
    }
}

#[async_trait::async_trait]
impl FeedFetcher for HttpFeedFetcher {
    fn source_name(&self) -> &'static str {
        "bulk_feed_http"
    }

    async fn fetch_feed(&self) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once().await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, error = %err, "feed fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
