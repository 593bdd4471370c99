//! Node transport over plain HTTP.
//!
//! The node serves its log endpoints (`/logs/list`, `/logs/read`, ...)
//! relative to a base URL. Non-success statuses are turned into error text
//! that includes the body the node sent back.

use async_trait::async_trait;
use bytes::Bytes;

use crate::bridge::NodeTransport;
use crate::config::NodeConfig;

/// HTTP client for one node.
#[derive(Debug, Clone)]
pub struct HttpNodeTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpNodeTransport {
    /// Creates a transport for the node reachable at `base_url`.
    ///
    /// # Errors
    /// - `reqwest::Error` - The HTTP client could not be initialized
    pub fn new(base_url: impl Into<String>, config: &NodeConfig) -> Result<Self, reqwest::Error> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a request target; the trailing newline of wire targets is dropped.
    pub fn url_for(&self, target: &str) -> String {
        format!("{}{}", self.base_url, target.trim_end_matches('\n'))
    }
}

#[async_trait]
impl NodeTransport for HttpNodeTransport {
    async fn fetch(&self, target: &str) -> Result<Bytes, String> {
        let url = self.url_for(target);
        tracing::debug!("Fetching {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| format!("reading response from {url} failed: {e}"))?;

        if !status.is_success() {
            return Err(format!("{status}: {}", String::from_utf8_lossy(&body)));
        }

        Ok(body)
    }
}
