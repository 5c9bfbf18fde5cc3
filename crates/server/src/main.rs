//! StatusHub - live status backend for the app dashboard
//!
//! Serves up/down status for a configured catalog of container-backed
//! apps and services plus externally health-checked processes.

use anyhow::Result;
use status_lib::{DockerLister, EndpointProbe, RuntimeProbe, StatusAggregator, StatusMetrics};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting statushub");

    // Load configuration; the catalog is injected here and never
    // re-read per request
    let config = config::ServerConfig::load()?;
    info!(
        apps = config.catalog.apps.len(),
        services = config.catalog.services.len(),
        "Catalog loaded"
    );

    let metrics = StatusMetrics::new();

    let lister = DockerLister::new(
        config.runtime_bin.as_str(),
        Duration::from_secs(config.runtime_timeout_secs),
    );
    let runtime_probe = RuntimeProbe::new(Arc::new(lister), metrics.clone());
    let endpoint_probe = EndpointProbe::new(
        Duration::from_secs(config.endpoint_timeout_secs),
        metrics.clone(),
    );

    let aggregator = Arc::new(StatusAggregator::new(
        Arc::new(config.catalog.clone()),
        runtime_probe,
        endpoint_probe,
        metrics,
    ));

    let app_state = Arc::new(api::AppState::new(aggregator));

    // Start the status API server
    let api_handle = tokio::spawn({
        let cors_origins = config.cors_origins.clone();
        async move { api::serve(config.api_port, app_state, &cors_origins).await }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
        result = api_handle => {
            result??;
        }
    }

    Ok(())
}
