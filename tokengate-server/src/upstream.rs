//! Upstream time API access with base URL fallback
//!
//! Admitted requests are forwarded to the upstream API. Several base URLs
//! may serve the same API; they are tried in order and the first successful
//! JSON response is passed through unchanged.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Every base URL failed; carries the last failure
    #[error("all {attempts} upstream(s) failed, last error: {last}")]
    Exhausted { attempts: usize, last: String },
    #[error("no upstream base URLs configured")]
    NoUpstreams,
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Source of upstream data for admitted requests
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch `path` (with an optional raw query string) and return its JSON body
    async fn fetch(&self, path: &str, query: Option<&str>) -> Result<Value, UpstreamError>;
}

/// reqwest-backed upstream trying each base URL in order
pub struct HttpUpstream {
    client: reqwest::Client,
    base_urls: Vec<String>,
}

impl HttpUpstream {
    pub fn new(base_urls: Vec<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        if base_urls.is_empty() {
            return Err(UpstreamError::NoUpstreams);
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_urls })
    }

    pub fn base_urls(&self) -> &[String] {
        &self.base_urls
    }

    async fn fetch_one(&self, url: &str) -> Result<Value, String> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{url} returned {status}"));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| format!("invalid JSON from {url}: {e}"))
    }
}

/// Join a base URL, a path and an optional query without doubling slashes
pub fn build_url(base: &str, path: &str, query: Option<&str>) -> String {
    let mut url = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, path: &str, query: Option<&str>) -> Result<Value, UpstreamError> {
        let mut last = String::new();

        for base in &self.base_urls {
            let url = build_url(base, path, query);
            match self.fetch_one(&url).await {
                Ok(body) => {
                    tracing::debug!("Upstream {} served {}", base, path);
                    return Ok(body);
                }
                Err(e) => {
                    tracing::warn!("Upstream attempt failed, trying next: {}", e);
                    last = e;
                }
            }
        }

        Err(UpstreamError::Exhausted {
            attempts: self.base_urls.len(),
            last,
        })
    }
}
