use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::Gateway;
use crate::core::fetch::Fetcher;

#[derive(Debug, Serialize)]
pub(super) struct CacheHealth {
    bucket: String,
    entries: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    version: &'static str,
    cache: CacheHealth,
}

pub(super) async fn health_check<F: Fetcher + 'static>(
    State(gateway): State<Arc<Gateway<F>>>,
) -> Json<HealthResponse> {
    let cache = gateway.router.cache();
    let entries = match cache.entry_count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!("Health check could not count cache entries: {}", e);
            None
        }
    };

    Json(HealthResponse {
        status: if entries.is_some() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        cache: CacheHealth {
            bucket: cache.version().to_string(),
            entries,
        },
    })
}
