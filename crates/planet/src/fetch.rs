// planet/src/fetch.rs
//! 网络拉取模块

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{
    CONTENT_TYPE, ETAG, HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::PlanetConfig;
use crate::error::{FeedFetchError, PlanetError};
use crate::subscription::Validators;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFeed {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    /// Validators to send on the next request
    pub validators: Validators,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server confirmed our copy is current
    NotModified,
    Fetched(FetchedFeed),
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str, validators: &Validators) -> Result<FetchOutcome, FeedFetchError>;
}

/// `reqwest` fetcher with connect and total timeouts and a body size cap
#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: Client,
    timeout: Duration,
    max_body_bytes: u64,
}

impl HttpFeedFetcher {
    pub fn new(config: &PlanetConfig) -> Result<Self, PlanetError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.fetch_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| PlanetError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout: config.fetch_timeout(),
            max_body_bytes: config.max_body_bytes,
        })
    }

    fn classify(&self, error: reqwest::Error) -> FeedFetchError {
        if error.is_timeout() {
            FeedFetchError::Timeout(self.timeout)
        } else {
            FeedFetchError::Network(error.to_string())
        }
    }
}

fn header(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str, validators: &Validators) -> Result<FetchOutcome, FeedFetchError> {
        let mut request = self.client.get(url);
        if let Some(etag) = &validators.etag {
            request = request.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &validators.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }

        let mut response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            debug!(url, "Feed not modified");
            return Ok(FetchOutcome::NotModified);
        }
        if !status.is_success() {
            return Err(FeedFetchError::Status(status.as_u16()));
        }

        let limit = self.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(FeedFetchError::TooLarge { limit });
        }

        let headers = response.headers();
        let content_type = header(headers, CONTENT_TYPE);
        let fresh = Validators {
            etag: header(headers, ETAG),
            last_modified: header(headers, LAST_MODIFIED),
        };

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(e))? {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(FeedFetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url, bytes = body.len(), "Fetched feed");
        Ok(FetchOutcome::Fetched(FetchedFeed {
            body,
            content_type,
            validators: fresh,
        }))
    }
}
