//! Network fetch collaborator.
//!
//! All network reads of the caching layer go through [`AssetFetcher`], so
//! hosts can swap the transport and tests can count calls. The default
//! implementation is a thin reqwest client resolving asset paths against
//! the remote app's origin.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::error::AssetError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Abstraction over the host's network GET primitive.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch the full body behind an asset URL.
    async fn fetch(&self, url: &str) -> Result<Bytes, AssetError>;
}

/// Configurable options for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Origin the relative asset URLs resolve against.
    pub origin: String,
    /// User agent string.
    pub user_agent: String,
    /// Overall request timeout; `None` leaves timeout policy to the
    /// transport defaults.
    pub timeout: Option<Duration>,
}

impl FetcherConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    client: Client,
    origin: Url,
}

impl HttpFetcher {
    /// Create a fetcher with the provided configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self, AssetError> {
        let origin =
            Url::parse(&config.origin).map_err(|_| AssetError::Url(config.origin.clone()))?;

        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            origin,
        })
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, AssetError> {
        let target = self
            .origin
            .join(url)
            .map_err(|_| AssetError::Url(url.to_owned()))?;

        let response = self.client.get(target).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status(status));
        }

        Ok(response.bytes().await?)
    }
}
