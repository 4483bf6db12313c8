//! HTTP gateway - the front door every dashboard request goes through.
//!
//! `/healthz` reports service and cache status. Every other request is turned
//! into an [`AssetRequest`], answered by the [`RequestRouter`] and written
//! back unchanged.

mod health;

use crate::{
    core::{
        fetch::{AssetRequest, AssetResponse, Fetcher, is_hop_by_hop},
        router::{RequestClass, RequestRouter},
    },
    errors::{Error, Result},
};
use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use reqwest::Url;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Largest request body the gateway forwards
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Shared gateway state
#[derive(Debug)]
pub struct Gateway<F> {
    router: RequestRouter<F>,
    app_origin: Url,
}

impl<F: Fetcher + 'static> Gateway<F> {
    /// Creates a gateway; origin-form request paths are resolved against
    /// `app_origin`.
    pub fn new(router: RequestRouter<F>, app_origin: &str) -> Result<Self> {
        let app_origin = Url::parse(app_origin).map_err(|e| Error::InvalidUrl {
            url: app_origin.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { router, app_origin })
    }

    /// Builds the axum application
    pub fn into_app(self) -> Router {
        Router::new()
            .route("/healthz", get(health::health_check::<F>))
            .fallback(proxy::<F>)
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::new(self))
    }

    /// Only the app origin and the telemetry hosts are proxied.
    fn check_target(&self, request: &AssetRequest) -> Result<()> {
        let same_origin = request.url.origin() == self.app_origin.origin();
        if same_origin || self.router.classify(request) == RequestClass::Telemetry {
            Ok(())
        } else {
            Err(Error::ForbiddenTarget {
                url: request.url.to_string(),
            })
        }
    }
}

/// Absolute URL a request is aimed at.
///
/// Absolute-form targets (`GET https://api.thingspeak.com/...`) are used
/// as-is; origin-form targets (`GET /IITMZ_WDN/app.js`) are joined to
/// `app_origin`.
pub fn resolve_target(uri: &Uri, app_origin: &Url) -> Result<Url> {
    let invalid = |e: &dyn std::fmt::Display| Error::InvalidUrl {
        url: uri.to_string(),
        reason: e.to_string(),
    };
    if uri.scheme().is_some() {
        return Url::parse(&uri.to_string()).map_err(|e| invalid(&e));
    }
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    app_origin.join(path).map_err(|e| invalid(&e))
}

async fn to_asset_request(request: Request, app_origin: &Url) -> Result<AssetRequest> {
    let (parts, body) = request.into_parts();
    let url = resolve_target(&parts.uri, app_origin)?;
    let headers = parts
        .headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| Error::RequestBody {
            reason: e.to_string(),
        })?;

    Ok(AssetRequest {
        method: parts.method,
        url,
        headers,
        body: body.to_vec(),
    })
}

fn into_http_response(asset: AssetResponse) -> Response {
    // status 0 marks a network error response
    let status = StatusCode::from_u16(asset.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = Response::new(Body::from(asset.body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in &asset.headers {
        if is_hop_by_hop(name) {
            continue;
        }
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!("Dropping unrepresentable header {}", name),
        }
    }
    response
}

async fn proxy<F: Fetcher + 'static>(
    State(gateway): State<Arc<Gateway<F>>>,
    request: Request,
) -> Response {
    let asset_request = match to_asset_request(request, &gateway.app_origin).await {
        Ok(r) => r,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };
    if let Err(e) = gateway.check_target(&asset_request) {
        warn!("{}", e);
        return (StatusCode::FORBIDDEN, e.to_string()).into_response();
    }

    match gateway.router.handle(&asset_request).await {
        Ok(asset) => into_http_response(asset),
        Err(e) => {
            warn!("Upstream failure for {}: {}", asset_request.url, e);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Serves `app` on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    info!("Gateway listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
