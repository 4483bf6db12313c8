//! Fetch types - requests and responses flowing through the gateway.
//!
//! [`Fetcher`] is the seam between the routing/caching logic and the live
//! network. [`HttpFetcher`] is the `reqwest`-backed implementation; tests use
//! in-memory fakes.

use crate::errors::{Error, Result};
use reqwest::{Method, Url};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};

/// Body of the synthesized offline response
pub const OFFLINE_BODY: &str = "Offline - cached data may not be current";

/// Headers that describe a single connection and must not be forwarded
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "content-length",
    "host",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Whether `name` is a connection-level header that must not be forwarded
#[must_use]
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Response type, mirroring the Fetch API distinction that matters for caching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// Ordinary response
    #[default]
    Basic,
    /// Network error response; never cached
    Error,
}

/// An intercepted request
#[derive(Debug, Clone)]
pub struct AssetRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute target URL
    pub url: Url,
    /// Request headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Request body (empty for GET)
    pub body: Vec<u8>,
}

impl AssetRequest {
    /// A bodiless GET for `url`
    #[must_use]
    pub const fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Parses `url` and builds a GET for it
    pub fn get_str(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::get(parsed))
    }

    /// Cache key for this request
    #[must_use]
    pub fn cache_key(&self) -> &str {
        self.url.as_str()
    }

    /// Only GET requests are stored in or served from the cache
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    /// Host part of the target URL
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }
}

/// A live or cached response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
    /// Basic or error
    pub response_type: ResponseType,
}

impl AssetResponse {
    /// A basic response with no headers
    #[must_use]
    pub const fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
            response_type: ResponseType::Basic,
        }
    }

    /// Adds a header
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// The fixed response returned when cache and network both fail
    #[must_use]
    pub fn offline() -> Self {
        Self::new(503, OFFLINE_BODY.as_bytes().to_vec()).with_header("content-type", "text/plain")
    }

    /// A network error response, as produced by `Response.error()`
    #[must_use]
    pub const fn network_error() -> Self {
        Self {
            status: 0,
            headers: Vec::new(),
            body: Vec::new(),
            response_type: ResponseType::Error,
        }
    }

    /// Clean success worth keeping: status exactly 200 and not an error response
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type != ResponseType::Error
    }

    /// First value of a header, case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Performs live network fetches.
pub trait Fetcher: Send + Sync {
    /// Fetches `request` from the network. `Err` means no response at all
    /// (connection failure, DNS, timeout); HTTP error statuses are `Ok`.
    fn fetch(&self, request: &AssetRequest) -> impl Future<Output = Result<AssetResponse>> + Send;
}

/// `reqwest`-backed [`Fetcher`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a client with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("waterline/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();
        debug!("Fetched {} ({} bytes, status {})", request.url, body.len(), status);

        Ok(AssetResponse {
            status,
            headers,
            body,
            response_type: ResponseType::Basic,
        })
    }
}
