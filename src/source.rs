// File: src/source.rs
// Where the latest-blocks table gets its rows from

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::chain::SharedChain;
use crate::data_models::{BlockPage, PageRequest};

/// Path of the latest-blocks data endpoint
pub const LATEST_BLOCKS_ENDPOINT: &str = "/data/lastestBlocks.data";

/// Upper bound on a single page request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint answered HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Server-side paging backend for the table widget
#[async_trait]
pub trait TableSource: Send + Sync {
    async fn fetch(&self, request: PageRequest) -> Result<BlockPage, SourceError>;

    /// Human readable origin, for logs and headers
    fn describe(&self) -> String;
}

/// Fetch pages from a remote explorer over HTTP
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    /// `base_url` is the explorer root, `endpoint` the data path below it
    pub fn new(base_url: &str, endpoint: &str) -> Result<Self, SourceError> {
        Self::with_timeout(base_url, endpoint, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Requests taking longer than `timeout` fail with [`SourceError::Http`]
    pub fn with_timeout(base_url: &str, endpoint: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), endpoint),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TableSource for HttpSource {
    async fn fetch(&self, request: PageRequest) -> Result<BlockPage, SourceError> {
        debug!(url = %self.url, draw = request.draw, "fetching table page");

        let response = self
            .client
            .get(&self.url)
            .query(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| SourceError::Decode(e.to_string()))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Answer from the in-process chain, exactly as the data endpoint would
#[derive(Debug, Clone)]
pub struct ChainSource {
    chain: SharedChain,
}

impl ChainSource {
    pub fn new(chain: SharedChain) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl TableSource for ChainSource {
    async fn fetch(&self, request: PageRequest) -> Result<BlockPage, SourceError> {
        Ok(self.chain.read().await.latest_blocks(request.draw))
    }

    fn describe(&self) -> String {
        format!("local chain {}", LATEST_BLOCKS_ENDPOINT)
    }
}
