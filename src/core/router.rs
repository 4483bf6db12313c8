//! Request routing - picks a fetch strategy for every intercepted request.
//!
//! Telemetry and map-provider traffic goes network-first so readings are as
//! fresh as possible, with the cache as an offline fallback. Everything else
//! is a static asset and goes cache-first, with the network as a backstop and
//! a fixed 503 response when both are unavailable.

use crate::{
    core::{
        cache::AssetCache,
        fetch::{AssetRequest, AssetResponse, Fetcher},
    },
    errors::Result,
};
use tracing::{debug, instrument, warn};

/// Strategy class of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Live data: network-first
    Telemetry,
    /// Dashboard files: cache-first
    StaticAsset,
}

/// Routes requests between the live network and the asset cache.
#[derive(Debug)]
pub struct RequestRouter<F> {
    cache: AssetCache,
    fetcher: F,
    network_first_hosts: Vec<String>,
}

impl<F: Fetcher> RequestRouter<F> {
    /// Creates a router; requests to `network_first_hosts` (or their
    /// subdomains) are treated as telemetry.
    #[must_use]
    pub const fn new(cache: AssetCache, fetcher: F, network_first_hosts: Vec<String>) -> Self {
        Self {
            cache,
            fetcher,
            network_first_hosts,
        }
    }

    /// The cache this router reads and fills
    #[must_use]
    pub const fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Classifies a request by its target host
    #[must_use]
    pub fn classify(&self, request: &AssetRequest) -> RequestClass {
        let Some(host) = request.host() else {
            return RequestClass::StaticAsset;
        };
        let host = host.to_ascii_lowercase();
        let telemetry = self.network_first_hosts.iter().any(|suffix| {
            let suffix = suffix.to_ascii_lowercase();
            host == suffix
                || host
                    .strip_suffix(suffix.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        });
        if telemetry {
            RequestClass::Telemetry
        } else {
            RequestClass::StaticAsset
        }
    }

    /// Answers one intercepted request.
    ///
    /// Only telemetry requests can fail: static assets degrade to the offline
    /// response. Non-GET requests bypass the cache entirely.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn handle(&self, request: &AssetRequest) -> Result<AssetResponse> {
        if !request.is_cacheable() {
            debug!("Passing {} request straight to the network", request.method);
            return self.fetcher.fetch(request).await;
        }
        match self.classify(request) {
            RequestClass::Telemetry => self.network_first(request).await,
            RequestClass::StaticAsset => Ok(self.cache_first(request).await),
        }
    }

    /// Live fetch, mirrored into the cache in the background; cached copy on
    /// network failure; the network error when there is no cached copy.
    pub async fn network_first(&self, request: &AssetRequest) -> Result<AssetResponse> {
        let key = request.cache_key();
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    let cache = self.cache.clone();
                    let key = key.to_string();
                    let copy = response.clone();
                    tokio::spawn(async move {
                        if let Err(e) = cache.store(&key, &copy).await {
                            warn!("Failed to mirror {} into cache: {}", key, e);
                        }
                    });
                }
                Ok(response)
            }
            Err(network_error) => {
                warn!("Network fetch failed for {}: {}", key, network_error);
                match self.cache.lookup(key).await {
                    Ok(Some(cached)) => {
                        debug!("Serving cached copy of {}", key);
                        Ok(cached)
                    }
                    Ok(None) => Err(network_error),
                    Err(cache_error) => {
                        warn!("Cache lookup failed for {}: {}", key, cache_error);
                        Err(network_error)
                    }
                }
            }
        }
    }

    /// Cached copy if present; otherwise a live fetch, stored when it is a
    /// clean 200; the offline response when both fail.
    pub async fn cache_first(&self, request: &AssetRequest) -> AssetResponse {
        let key = request.cache_key();
        match self.cache.lookup(key).await {
            Ok(Some(cached)) => return cached,
            Ok(None) => {}
            Err(e) => warn!("Cache lookup failed for {}: {}", key, e),
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    if let Err(e) = self.cache.store(key, &response).await {
                        warn!("Failed to cache {}: {}", key, e);
                    }
                }
                response
            }
            Err(e) => {
                warn!("Serving offline response for {}: {}", key, e);
                AssetResponse::offline()
            }
        }
    }
}
