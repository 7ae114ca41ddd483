use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::feed::parser::{parse_feed, ParseError, ParsedFeed};

/// Errors from a single feed fetch.
///
/// None of these are retried in place; the feed simply comes due again on a
/// later rotation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The configured request timeout elapsed
    #[error("Request timed out")]
    Timeout,
    /// Body exceeded `max_feed_bytes`
    #[error("Response too large (limit {limit} bytes)")]
    ResponseTooLarge { limit: usize },
    /// Body is not an RSS 2.0 document
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FetchError {
    /// Transport or HTTP-status failure, as opposed to a bad payload.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            FetchError::Network(_) | FetchError::HttpStatus(_) | FetchError::Timeout
        )
    }
}

/// Retrieves and decodes a feed by URL.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, FetchError>;
}

/// [`FeedFetcher`] over HTTP(S).
///
/// Issues exactly one GET per call with a fixed `User-Agent`, follows
/// redirects per reqwest's default policy, and never retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(
        user_agent: &str,
        timeout: Option<Duration>,
        max_bytes: usize,
    ) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            max_bytes,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(
            &config.user_agent,
            config.fetch_timeout_secs.map(Duration::from_secs),
            config.max_feed_bytes,
        )
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, FetchError> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let bytes = read_limited_bytes(response, self.max_bytes).await?;
        let feed = parse_feed(&bytes)?;

        tracing::debug!(
            feed = %url,
            bytes = bytes.len(),
            items = feed.items.len(),
            "Fetched feed"
        );
        Ok(feed)
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err)
    }
}

async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    // Fast path: trust an honest Content-Length
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge { limit });
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge { limit });
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
