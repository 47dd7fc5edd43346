//! HTTP fetch helpers
//!
//! Thin wrappers around reqwest with no caching and no retries. The updater
//! core only ever sees the `Fetch` contract, so tests can substitute canned
//! responses.

use anyhow::{Context, Result};
use async_trait::async_trait;

const USER_AGENT: &str = concat!("clx/", env!("CARGO_PKG_VERSION"));

/// A completed GET: status code plus the full body.
#[derive(Debug, Clone)]
pub struct Download {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Remote-resource access used by the updater.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch raw bytes from a URL, failing on any non-success status.
    async fn load(&self, url: &str) -> Result<Vec<u8>>;

    /// Issue a GET and return the status with the body, leaving status
    /// interpretation to the caller.
    async fn get(&self, url: &str) -> Result<Download>;
}

/// reqwest-backed fetcher.
pub struct HttpFetch {
    client: reqwest::Client,
}

impl HttpFetch {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpFetch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetch for HttpFetch {
    async fn load(&self, url: &str) -> Result<Vec<u8>> {
        // Plain paths resolve to the local filesystem, which lets air-gapped
        // mirrors point the metadata URL at a file.
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return std::fs::read(url).with_context(|| format!("failed to read {}", url));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("failed to fetch {}", url))?;

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("failed to read response from {}", url))?;
        Ok(bytes.to_vec())
    }

    async fn get(&self, url: &str) -> Result<Download> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch {}", url))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("failed to read response from {}", url))?
            .to_vec();

        Ok(Download { status, body })
    }
}
