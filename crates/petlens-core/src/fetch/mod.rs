//! Image retrieval over HTTP.
//!
//! One GET per message, no retries. Transport failures and non-success
//! statuses surface as [`PipelineError::Fetch`]; bodies that are not images
//! surface as [`PipelineError::Decode`].

pub mod decode;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::FetchConfig;
use crate::error::{ConfigError, PipelineError};

pub use decode::DecodedImage;

/// Anything that can turn an image URL into a decoded image.
///
/// Uses `async_trait` so the worker can hold a `Box<dyn ImageSource>`.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch and decode the image at `url`.
    async fn fetch(&self, url: &str) -> Result<DecodedImage, PipelineError>;
}

/// Fetches images with a shared `reqwest` client.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from config.
    ///
    /// Fails on settings reqwest rejects, such as a User-Agent that is not a
    /// valid header value.
    pub fn new(config: &FetchConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Fetch {
                url: url.to_string(),
                message: format!("Request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {status}"),
                status_code: Some(status.as_u16()),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| PipelineError::Fetch {
            url: url.to_string(),
            message: format!("Failed to read response body: {e}"),
            status_code: Some(status.as_u16()),
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<DecodedImage, PipelineError> {
        let bytes = self.fetch_bytes(url).await?;
        tracing::trace!("Fetched {} bytes from {}", bytes.len(), url);
        decode::decode_bytes(bytes, url).await
    }
}
