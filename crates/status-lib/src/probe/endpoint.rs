//! HTTP endpoint health probe
//!
//! Probes external, non-containerized services with a single GET to
//! `{base}/status`. The request carries its own deadline and is
//! aborted when it elapses; every failure mode resolves to offline.

use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::catalog::Status;
use crate::observability::StatusMetrics;

/// Default deadline for one endpoint check
pub const DEFAULT_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(3);

/// Probe for external HTTP health endpoints
#[derive(Clone)]
pub struct EndpointProbe {
    client: Client,
    timeout: Duration,
    metrics: StatusMetrics,
}

impl EndpointProbe {
    pub fn new(timeout: Duration, metrics: StatusMetrics) -> Self {
        Self {
            client: Client::new(),
            timeout,
            metrics,
        }
    }

    /// Check one service endpoint; never fails
    ///
    /// Online iff the endpoint answers 2xx within the deadline with a
    /// JSON body whose `status` field is the literal `"UP"`. A
    /// malformed or non-JSON body counts as an empty object. No
    /// retries: one timeout is a final offline verdict for this pass.
    pub async fn check(&self, base_url: &str) -> Status {
        let start = Instant::now();
        let status = self.check_inner(base_url).await;
        self.metrics
            .observe_endpoint_probe_latency(start.elapsed().as_secs_f64());
        if status == Status::Offline {
            self.metrics.inc_endpoint_probe_failures();
        }
        status
    }

    async fn check_inner(&self, base_url: &str) -> Status {
        let url = format!("{}/status", base_url.trim_end_matches('/'));

        let response = match self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                debug!(url = %url, error = %err, "Endpoint unreachable");
                return Status::Offline;
            }
        };

        if !response.status().is_success() {
            debug!(url = %url, http_status = %response.status(), "Endpoint returned non-2xx");
            return Status::Offline;
        }

        // Malformed bodies are treated as an empty object, not an error
        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or_else(|_| serde_json::json!({}));

        match body.get("status").and_then(serde_json::Value::as_str) {
            Some("UP") => Status::Online,
            _ => Status::Offline,
        }
    }
}
