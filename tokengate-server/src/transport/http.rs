//! HTTP/JSON transport
//!
//! # API Endpoints
//!
//! ## GET /api/{*path}
//!
//! Rate limited per client. Admitted requests are forwarded to the upstream
//! time API at the same path (query string included) and the upstream JSON
//! is returned as-is. The path is forwarded exactly as received, percent
//! encoding intact. Paths with dot segments (`..`, `%2e%2e`) are rejected
//! with `400 Bad Request`.
//!
//! Admitted responses carry:
//!
//! ```text
//! X-RateLimit-Limit: 10
//! X-RateLimit-Remaining: 9
//! ```
//!
//! Denied requests receive `429 Too Many Requests` with a `Retry-After`
//! header and:
//!
//! ```json
//! {
//!   "error": "rate limit exceeded",
//!   "retryAfter": 2
//! }
//! ```
//!
//! If every upstream fails the response is `502 Bad Gateway`.
//!
//! ## GET /health
//!
//! Health check endpoint. Returns "OK" with 200 status. Not rate limited.

use crate::identity::client_identifier;
use crate::types::{ErrorResponse, RateLimitedResponse};
use crate::upstream::Upstream;
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokengate::{AdmissionController, Decision};

pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// State shared by all handlers
pub struct AppState {
    pub controller: AdmissionController,
    pub upstream: Arc<dyn Upstream>,
}

/// HTTP transport implementation
pub struct HttpTransport {
    addr: SocketAddr,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid listen address {host}:{port}"))?;
        Ok(Self { addr })
    }

    /// Serve until `shutdown` resolves
    pub async fn start(
        self,
        state: Arc<AppState>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("HTTP server listening on {}", self.addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        Ok(())
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let limited = Router::new()
        .route("/api/{*path}", get(handle_proxy))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(limited)
        .with_state(state)
}

async fn rate_limit(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_identifier(request.headers(), peer);

    let decision = state.controller.check(&client);
    if !decision.allowed {
        let retry_after = decision.retry_after_secs();
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitedResponse::new(retry_after)),
        )
            .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        insert_limit_headers(&mut response, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    insert_limit_headers(&mut response, &decision);
    response
}

fn insert_limit_headers(response: &mut Response, decision: &Decision) {
    let headers = response.headers_mut();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
}

/// Raw request path without its leading slash, unless it holds a dot segment
fn forwarded_path(uri: &Uri) -> Option<&str> {
    let path = uri.path();
    let has_dot_segment = path.split('/').any(|segment| {
        let segment = segment.to_ascii_lowercase().replace("%2e", ".");
        segment == "." || segment == ".."
    });
    (!has_dot_segment).then(|| path.trim_start_matches('/'))
}

async fn handle_proxy(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let Some(upstream_path) = forwarded_path(&uri) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid path".to_string(),
            }),
        ));
    };

    match state.upstream.fetch(upstream_path, uri.query()).await {
        Ok(body) => Ok(Json(body)),
        Err(e) => {
            tracing::error!("Upstream error for {}: {}", upstream_path, e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("Upstream unavailable: {e}"),
                }),
            ))
        }
    }
}
