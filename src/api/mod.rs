mod announce;
mod auth;
mod status;

pub use announce::{AnnounceRequest, ColorValue};
pub use auth::{SupabaseAuth, TokenVerifier};
pub use status::format_duration;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderValue, Method, Request, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::announcements::AnnouncementService;

/// Shared state for the API handlers
#[derive(Clone)]
pub struct AppState {
    pub announcements: AnnouncementService,
    /// Bearer-token verification; password auth only when absent
    pub verifier: Option<Arc<dyn TokenVerifier>>,
    pub admin_password: String,
    /// Used when a request does not name a channel
    pub default_channel_id: Option<String>,
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

// Middleware for request logging with correlation ID
async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    // Route template, so unknown paths share one series
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let request_id = Uuid::new_v4().to_string()[..8].to_string();
    let start_time = Instant::now();

    info!("Started {} {} [{}]", method, path, request_id);

    let response = next.run(request).await;
    let duration = start_time.elapsed();
    let status = response.status();

    info!(
        "Completed {} {} [{}] {} in {:.2}ms",
        method,
        path,
        request_id,
        status.as_u16(),
        duration.as_secs_f64() * 1000.0
    );
    metrics::histogram!("http_request_duration_seconds", "path" => route)
        .record(duration.as_secs_f64());

    response
}

// Report 5xx responses to Sentry
async fn sentry_error_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    if response.status().is_server_error() {
        let status = response.status();
        error!("HTTP {} error on {} {}", status.as_u16(), method, uri);

        sentry::configure_scope(|scope| {
            scope.set_tag("http.method", method.as_str());
            scope.set_tag("http.url", uri.to_string());
            scope.set_tag("http.status_code", status.as_u16().to_string());
        });
        sentry::capture_message(
            &format!("HTTP {} error on {} {}", status.as_u16(), method, uri),
            sentry::Level::Error,
        );
    }

    response
}

/// CORS for the configured origins; `*` allows any origin
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/announce", post(announce::announce))
        .route("/status", get(status::status))
        .route("/metrics", get(status::metrics))
        .with_state(state)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(middleware::from_fn(sentry_error_middleware))
        .layer(cors_layer(allowed_origins))
}

/// Serve the API until `shutdown` is cancelled
pub async fn serve(
    state: AppState,
    interface: &str,
    port: u16,
    allowed_origins: &[String],
    shutdown: CancellationToken,
) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "api-server");
    });

    let app = router(state, allowed_origins);
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", interface, port)).await?;
    info!("API server listening on http://{}:{}", interface, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("API server stopped");
    Ok(())
}
