//! Fetch transports
//!
//! This module handles:
//! - The `Transport` capability the fetcher drives
//! - An HTTP transport with proxy, user agent and TLS settings
//! - Resolving query work items through a directory search template

use crate::config::{FetcherConfig, ProxyCredentials, QUERY_PLACEHOLDER};
use crate::frontier::WorkItem;
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use thiserror::Error;
use url::Url;

/// Errors from a single transport attempt
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("No search URL template configured for query '{0}'")]
    NoSearchTemplate(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Body retrieved for a work item
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL the content came from, after redirects
    pub url: Url,
    pub body: String,
}

/// Retrieves raw content for a work item
///
/// Implementations may render pages in a browser or call APIs directly;
/// the harvester only relies on this contract.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, item: &WorkItem) -> Result<FetchedPage, TransportError>;
}

/// Builds the HTTP client used by [`HttpTransport`]
///
/// # Arguments
///
/// * `config` - The `[fetcher]` config section
/// * `proxy_credentials` - Proxy user and password, if the proxy needs them
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &FetcherConfig,
    proxy_credentials: Option<&ProxyCredentials>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .brotli(true);

    if let Some(proxy_config) = &config.proxy {
        let mut proxy = Proxy::all(proxy_config.url.as_str())?;
        if let Some(creds) = proxy_credentials {
            proxy = proxy.basic_auth(&creds.username, &creds.password);
        }
        builder = builder.proxy(proxy);
    }

    builder.build()
}

/// Fills a search template with form-encoded search terms
pub fn search_url(template: &str, terms: &str) -> Result<Url, TransportError> {
    let encoded: String = url::form_urlencoded::byte_serialize(terms.as_bytes()).collect();
    let raw = template.replace(QUERY_PLACEHOLDER, &encoded);
    Url::parse(&raw).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", raw, e)))
}

/// Plain HTTP transport
///
/// Per-attempt timeouts belong to the fetcher, so the client itself has
/// none.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    search_url_template: Option<String>,
}

impl HttpTransport {
    pub fn new(
        config: &FetcherConfig,
        proxy_credentials: Option<&ProxyCredentials>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, proxy_credentials)?,
            search_url_template: config.search_url_template.clone(),
        })
    }

    /// Returns the URL a work item is fetched from
    pub fn request_url(&self, item: &WorkItem) -> Result<Url, TransportError> {
        match item {
            WorkItem::Url(url) => Ok(url.clone()),
            WorkItem::Query { .. } => {
                let terms = item.search_terms().unwrap_or_default();
                let template = self
                    .search_url_template
                    .as_deref()
                    .ok_or_else(|| TransportError::NoSearchTemplate(terms.clone()))?;
                search_url(template, &terms)
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, item: &WorkItem) -> Result<FetchedPage, TransportError> {
        let request_url = self.request_url(item)?;
        let response = self.client.get(request_url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: request_url.to_string(),
            });
        }

        let url = response.url().clone();
        let body = response.text().await?;
        Ok(FetchedPage { url, body })
    }
}
