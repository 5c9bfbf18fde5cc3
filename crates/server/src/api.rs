//! HTTP API for status reports, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use status_lib::StatusAggregator;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<StatusAggregator>,
}

impl AppState {
    pub fn new(aggregator: Arc<StatusAggregator>) -> Self {
        Self { aggregator }
    }
}

/// Full report: apps and services, catalog order, always 200
async fn full_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.aggregator.full_status().await)
}

/// App entries only
async fn apps_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.aggregator.apps_status().await)
}

/// Service entries only
async fn services_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.aggregator.services_status().await)
}

/// Process liveness; probe failures never affect this
async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %err, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Build the CORS layer from configured origins; "*" allows any
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/status", get(full_status))
        .route("/status/apps", get(apps_status))
        .route("/status/services", get(services_status))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>, cors_origins: &[String]) -> anyhow::Result<()> {
    let app = create_router(state, cors_origins);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting status API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
