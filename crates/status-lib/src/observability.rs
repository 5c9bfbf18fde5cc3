//! Probe and request metrics
//!
//! Prometheus metrics for the aggregation engine: probe latencies,
//! probe failures, and status request counts.

use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};
use std::sync::OnceLock;

/// Histogram buckets for probe latencies (in seconds); probes carry
/// deadlines in the low-single-digit-seconds range
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<StatusMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct StatusMetricsInner {
    runtime_probe_latency_seconds: Histogram,
    endpoint_probe_latency_seconds: Histogram,
    runtime_probe_failures: IntCounter,
    endpoint_probe_failures: IntCounter,
    status_requests: IntCounter,
}

impl StatusMetricsInner {
    fn new() -> Self {
        Self {
            runtime_probe_latency_seconds: register_histogram!(
                "statushub_runtime_probe_latency_seconds",
                "Time spent listing running containers",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register runtime_probe_latency_seconds"),

            endpoint_probe_latency_seconds: register_histogram!(
                "statushub_endpoint_probe_latency_seconds",
                "Time spent on a single HTTP endpoint health check",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register endpoint_probe_latency_seconds"),

            runtime_probe_failures: register_int_counter!(
                "statushub_runtime_probe_failures_total",
                "Container runtime listings that failed or timed out"
            )
            .expect("Failed to register runtime_probe_failures_total"),

            endpoint_probe_failures: register_int_counter!(
                "statushub_endpoint_probe_failures_total",
                "Endpoint health checks that resolved offline"
            )
            .expect("Failed to register endpoint_probe_failures_total"),

            status_requests: register_int_counter!(
                "statushub_status_requests_total",
                "Status aggregation requests served"
            )
            .expect("Failed to register status_requests_total"),
        }
    }
}

/// Metrics handle for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct StatusMetrics {
    _private: (),
}

impl Default for StatusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(StatusMetricsInner::new);
        Self { _private: () }
    }

    fn inner() -> &'static StatusMetricsInner {
        GLOBAL_METRICS.get_or_init(StatusMetricsInner::new)
    }

    pub fn observe_runtime_probe_latency(&self, seconds: f64) {
        Self::inner().runtime_probe_latency_seconds.observe(seconds);
    }

    pub fn observe_endpoint_probe_latency(&self, seconds: f64) {
        Self::inner()
            .endpoint_probe_latency_seconds
            .observe(seconds);
    }

    pub fn inc_runtime_probe_failures(&self) {
        Self::inner().runtime_probe_failures.inc();
    }

    pub fn inc_endpoint_probe_failures(&self) {
        Self::inner().endpoint_probe_failures.inc();
    }

    pub fn inc_status_requests(&self) {
        Self::inner().status_requests.inc();
    }
}
