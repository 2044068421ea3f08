//! HTTP transport seam.
//!
//! Providers never hold a client of their own; they go through a shared
//! [`Fetcher`] so tests can swap the network for canned responses.

use crate::error::{Result, SearchError};
use async_trait::async_trait;
use digger_core::{RetryPolicy, SearchConfig};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::net::{IpAddr, Ipv4Addr};
use url::Url;

/// One outgoing GET request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Target URL, query included
    pub url: Url,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// Plain GET of `url`.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    /// Add a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Trait for the HTTP transport used by providers.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the body of a successful response as text.
    ///
    /// # Errors
    /// Returns error on transport failures and non-success statuses.
    async fn fetch(&self, request: FetchRequest) -> Result<String>;
}

/// Fetch and deserialize a JSON body.
pub async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn Fetcher,
    request: FetchRequest,
    provider: &str,
) -> Result<T> {
    let body = fetcher.fetch(request).await?;
    serde_json::from_str(&body).map_err(|e| SearchError::parse(provider, e))
}

/// [`Fetcher`] backed by a shared `reqwest` client.
///
/// When IPv4-only mode is on, outgoing sockets are bound to `0.0.0.0`, which
/// keeps broken IPv6 routes from stalling lookups without touching any
/// process-wide setting.
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    /// Build a fetcher from the search settings.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.task_timeout());
        if config.ipv4_only {
            builder = builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        }
        let client = builder
            .build()
            .map_err(|e| SearchError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
        })
    }

    async fn fetch_once(&self, request: &FetchRequest) -> Result<String> {
        let mut builder = self.client.get(request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                url: request.url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<String> {
        let label = request.url.host_str().unwrap_or("request").to_string();
        self.retry
            .run(&label, |_| self.fetch_once(&request))
            .await
    }
}
