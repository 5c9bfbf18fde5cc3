//! Per-request status aggregation
//!
//! One aggregation pass classifies every catalog entry: the container
//! runtime is listed exactly once and shared across apps and services,
//! while endpoint-backed services are probed concurrently. Each pass
//! is stateless; nothing is remembered between requests.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::catalog::{AppStatus, Catalog, FullStatus, ServiceStatus, Status};
use crate::observability::StatusMetrics;
use crate::probe::{EndpointProbe, RunningSet, RuntimeProbe};

/// Classifies an injected catalog against live probe results
pub struct StatusAggregator {
    catalog: Arc<Catalog>,
    runtime: RuntimeProbe,
    endpoint: EndpointProbe,
    metrics: StatusMetrics,
}

impl StatusAggregator {
    pub fn new(
        catalog: Arc<Catalog>,
        runtime: RuntimeProbe,
        endpoint: EndpointProbe,
        metrics: StatusMetrics,
    ) -> Self {
        Self {
            catalog,
            runtime,
            endpoint,
            metrics,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Classify all app entries; one runtime listing per call
    pub async fn apps_status(&self) -> Vec<AppStatus> {
        self.metrics.inc_status_requests();
        let running = self.runtime.snapshot().await;
        self.classify_apps(&running)
    }

    /// Classify all service entries; one runtime listing per call
    pub async fn services_status(&self) -> Vec<ServiceStatus> {
        self.metrics.inc_status_requests();
        let pending = self.spawn_endpoint_checks();
        let running = self.runtime.snapshot().await;
        self.classify_services(&running, pending).await
    }

    /// Classify the whole catalog in one pass
    ///
    /// The runtime listing happens exactly once and is shared by the
    /// app and service classifications. Always succeeds: probe
    /// failures surface as offline entries, never as errors.
    pub async fn full_status(&self) -> FullStatus {
        self.metrics.inc_status_requests();
        let pending = self.spawn_endpoint_checks();
        let running = self.runtime.snapshot().await;

        let apps = self.classify_apps(&running);
        let services = self.classify_services(&running, pending).await;

        FullStatus { apps, services }
    }

    /// Start one probe task per endpoint-backed service, before the
    /// runtime listing is awaited, so pass latency tracks the slowest
    /// probe rather than their sum. `None` marks container-backed
    /// entries; positions mirror the service catalog.
    fn spawn_endpoint_checks(&self) -> Vec<Option<JoinHandle<Status>>> {
        self.catalog
            .services
            .iter()
            .map(|service| {
                service.endpoint.as_ref().map(|base_url| {
                    let probe = self.endpoint.clone();
                    let base_url = base_url.clone();
                    tokio::spawn(async move { probe.check(&base_url).await })
                })
            })
            .collect()
    }

    fn classify_apps(&self, running: &RunningSet) -> Vec<AppStatus> {
        self.catalog
            .apps
            .iter()
            .map(|app| AppStatus {
                app: app.clone(),
                status: Status::from_running(running.contains(&app.container_name)),
            })
            .collect()
    }

    async fn classify_services(
        &self,
        running: &RunningSet,
        pending: Vec<Option<JoinHandle<Status>>>,
    ) -> Vec<ServiceStatus> {
        let mut statuses = Vec::with_capacity(self.catalog.services.len());

        for (service, handle) in self.catalog.services.iter().zip(pending) {
            let status = match handle {
                Some(handle) => handle.await.unwrap_or_else(|err| {
                    warn!(service = %service.name, error = %err, "Endpoint probe task failed");
                    Status::Offline
                }),
                None => Status::from_running(running.contains(&service.container_name)),
            };

            statuses.push(ServiceStatus {
                name: service.name.clone(),
                container_name: service.container_name.clone(),
                status,
            });
        }

        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AppDescriptor, ServiceDescriptor};
    use crate::probe::{RuntimeError, RuntimeLister};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Lister fake that counts invocations
    struct CountingLister {
        running: Vec<String>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl CountingLister {
        fn with_running(names: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                running: names.iter().map(|n| n.to_string()).collect(),
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                running: Vec::new(),
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RuntimeLister for CountingLister {
        async fn list_running(&self) -> Result<Vec<String>, RuntimeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(RuntimeError::Timeout(Duration::from_secs(5)))
            } else {
                Ok(self.running.clone())
            }
        }
    }

    fn app(id: &str, container: &str) -> AppDescriptor {
        AppDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            icon: "📦".to_string(),
            url: format!("http://localhost/{}", id),
            container_name: container.to_string(),
            color: "#1976d2".to_string(),
        }
    }

    fn container_service(name: &str, container: &str) -> ServiceDescriptor {
        ServiceDescriptor {
            name: name.to_string(),
            container_name: container.to_string(),
            endpoint: None,
        }
    }

    fn endpoint_service(name: &str, base_url: &str) -> ServiceDescriptor {
        ServiceDescriptor {
            name: name.to_string(),
            container_name: name.to_lowercase(),
            endpoint: Some(base_url.to_string()),
        }
    }

    fn aggregator(
        catalog: Catalog,
        lister: Arc<dyn RuntimeLister>,
        endpoint_timeout: Duration,
    ) -> StatusAggregator {
        let metrics = StatusMetrics::new();
        StatusAggregator::new(
            Arc::new(catalog),
            RuntimeProbe::new(lister, metrics.clone()),
            EndpointProbe::new(endpoint_timeout, metrics.clone()),
            metrics,
        )
    }

    /// Serve a canned UP response for every connection
    async fn spawn_up_server(delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    tokio::time::sleep(delay).await;
                    let body = r#"{"status":"UP"}"#;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        format!("http://{}", addr)
    }

    /// Address that accepts connections but never answers
    async fn spawn_silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn membership_decides_container_backed_status() {
        let catalog = Catalog {
            apps: vec![app("wiki", "wiki-frontend"), app("docs", "docs-frontend")],
            services: vec![
                container_service("MySQL", "core-mysql"),
                container_service("Redis", "core-redis"),
            ],
        };
        let lister = CountingLister::with_running(&["wiki-frontend", "core-redis"]);
        let agg = aggregator(catalog, lister, Duration::from_secs(1));

        let report = agg.full_status().await;

        assert_eq!(report.apps[0].status, Status::Online);
        assert_eq!(report.apps[1].status, Status::Offline);
        assert_eq!(report.services[0].status, Status::Offline);
        assert_eq!(report.services[1].status, Status::Online);
    }

    #[tokio::test]
    async fn runtime_listing_happens_once_per_full_status() {
        let catalog = Catalog {
            apps: vec![app("wiki", "wiki-frontend")],
            services: vec![container_service("MySQL", "core-mysql")],
        };
        let lister = CountingLister::with_running(&["wiki-frontend"]);
        let agg = aggregator(catalog, lister.clone(), Duration::from_secs(1));

        agg.full_status().await;
        assert_eq!(lister.calls(), 1);

        agg.full_status().await;
        assert_eq!(lister.calls(), 2);
    }

    #[tokio::test]
    async fn runtime_failure_degrades_to_all_offline() {
        let catalog = Catalog {
            apps: vec![app("wiki", "wiki-frontend"), app("docs", "docs-frontend")],
            services: vec![container_service("MySQL", "core-mysql")],
        };
        let agg = aggregator(catalog, CountingLister::failing(), Duration::from_secs(1));

        let report = agg.full_status().await;

        assert_eq!(report.apps.len(), 2);
        assert_eq!(report.services.len(), 1);
        assert!(report.apps.iter().all(|a| a.status == Status::Offline));
        assert!(report.services.iter().all(|s| s.status == Status::Offline));
    }

    #[tokio::test]
    async fn output_order_matches_catalog_order() {
        let catalog = Catalog {
            apps: vec![app("c", "c-front"), app("a", "a-front"), app("b", "b-front")],
            services: vec![
                container_service("Zeta", "zeta"),
                container_service("Alpha", "alpha"),
            ],
        };
        let lister = CountingLister::with_running(&["a-front", "alpha"]);
        let agg = aggregator(catalog, lister, Duration::from_secs(1));

        let report = agg.full_status().await;

        let app_ids: Vec<&str> = report.apps.iter().map(|a| a.app.id.as_str()).collect();
        assert_eq!(app_ids, vec!["c", "a", "b"]);
        let svc_names: Vec<&str> = report.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(svc_names, vec!["Zeta", "Alpha"]);
    }

    #[tokio::test]
    async fn endpoint_backed_service_is_probed_over_http() {
        let up = spawn_up_server(Duration::ZERO).await;
        let catalog = Catalog {
            apps: Vec::new(),
            services: vec![
                container_service("Redis", "core-redis"),
                endpoint_service("LabelService", &up),
            ],
        };
        let lister = CountingLister::with_running(&["core-redis"]);
        let agg = aggregator(catalog, lister, Duration::from_secs(1));

        let report = agg.services_status().await;

        assert_eq!(report[0].status, Status::Online);
        assert_eq!(report[1].status, Status::Online);
    }

    #[tokio::test]
    async fn failing_endpoint_does_not_disturb_other_entries() {
        let up = spawn_up_server(Duration::ZERO).await;
        let dead = spawn_silent_server().await;
        let catalog = Catalog {
            apps: vec![app("wiki", "wiki-frontend")],
            services: vec![
                endpoint_service("Healthy", &up),
                endpoint_service("Dead", &dead),
                container_service("Redis", "core-redis"),
            ],
        };
        let lister = CountingLister::with_running(&["wiki-frontend", "core-redis"]);
        let agg = aggregator(catalog, lister, Duration::from_millis(300));

        let report = agg.full_status().await;

        assert_eq!(report.apps[0].status, Status::Online);
        assert_eq!(report.services[0].status, Status::Online);
        assert_eq!(report.services[1].status, Status::Offline);
        assert_eq!(report.services[2].status, Status::Online);
    }

    #[tokio::test]
    async fn endpoint_probes_run_concurrently() {
        // One slow-but-healthy endpoint and one that never answers,
        // both near the probe deadline: sequential awaiting would take
        // roughly the sum, concurrent dispatch roughly the max.
        let slow_up = spawn_up_server(Duration::from_millis(250)).await;
        let dead = spawn_silent_server().await;
        let catalog = Catalog {
            apps: Vec::new(),
            services: vec![
                endpoint_service("SlowButUp", &slow_up),
                endpoint_service("Dead", &dead),
            ],
        };
        let lister = CountingLister::with_running(&[]);
        let agg = aggregator(catalog, lister, Duration::from_millis(300));

        let start = Instant::now();
        let report = agg.services_status().await;
        let elapsed = start.elapsed();

        assert_eq!(report[0].status, Status::Online);
        assert_eq!(report[1].status, Status::Offline);
        assert!(
            elapsed < Duration::from_millis(500),
            "probes must not serialize: {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn every_entry_yields_exactly_one_status() {
        let catalog = Catalog {
            apps: vec![app("wiki", "wiki-frontend"), app("docs", "docs-frontend")],
            services: vec![
                container_service("MySQL", "core-mysql"),
                container_service("Redis", "core-redis"),
                container_service("Nginx", "core-nginx"),
            ],
        };
        let lister = CountingLister::with_running(&["core-mysql"]);
        let agg = aggregator(catalog, lister, Duration::from_secs(1));

        let report = agg.full_status().await;
        assert_eq!(report.apps.len(), 2);
        assert_eq!(report.services.len(), 3);
    }
}
