//! Container runtime probe
//!
//! Lists the names of currently running containers by spawning the
//! runtime's `ps` command. The listing is an external process and can
//! hang, so every invocation carries a deadline and the child is
//! killed when the deadline elapses.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::observability::StatusMetrics;

/// Default deadline for one runtime listing
pub const DEFAULT_RUNTIME_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from one runtime listing attempt
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to launch runtime listing command: {0}")]
    Launch(#[from] std::io::Error),
    #[error("runtime listing timed out after {0:?}")]
    Timeout(Duration),
    #[error("runtime listing exited with {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },
}

/// Set of container names running as of one aggregation pass
///
/// Produced fresh per pass and read-only afterwards; never cached
/// across requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunningSet(HashSet<String>);

impl RunningSet {
    pub fn contains(&self, container_name: &str) -> bool {
        self.0.contains(container_name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for RunningSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Trait for container runtime listing implementations
///
/// Abstracted so tests can substitute a fake without invoking a real
/// container runtime.
#[async_trait]
pub trait RuntimeLister: Send + Sync {
    /// List the names of all currently running containers
    async fn list_running(&self) -> Result<Vec<String>, RuntimeError>;
}

/// Runtime lister that shells out to `docker ps`
///
/// The binary name is configurable (podman accepts the same listing
/// arguments).
pub struct DockerLister {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl DockerLister {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: vec![
                "ps".to_string(),
                "--format".to_string(),
                "{{.Names}}".to_string(),
            ],
            timeout,
        }
    }
}

impl Default for DockerLister {
    fn default() -> Self {
        Self::new("docker", DEFAULT_RUNTIME_TIMEOUT)
    }
}

#[async_trait]
impl RuntimeLister for DockerLister {
    async fn list_running(&self) -> Result<Vec<String>, RuntimeError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| RuntimeError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(RuntimeError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_names(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse line-oriented listing output into trimmed, non-empty names
fn parse_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fail-open wrapper around a [`RuntimeLister`]
///
/// A runtime outage must not fail the status page: any listing error
/// degrades to an empty [`RunningSet`], which classifies every
/// container-backed entry offline.
#[derive(Clone)]
pub struct RuntimeProbe {
    lister: Arc<dyn RuntimeLister>,
    metrics: StatusMetrics,
}

impl RuntimeProbe {
    pub fn new(lister: Arc<dyn RuntimeLister>, metrics: StatusMetrics) -> Self {
        Self { lister, metrics }
    }

    /// Take one snapshot of the running containers; never fails
    pub async fn snapshot(&self) -> RunningSet {
        let start = Instant::now();
        let result = self.lister.list_running().await;
        self.metrics
            .observe_runtime_probe_latency(start.elapsed().as_secs_f64());

        match result {
            Ok(names) => {
                let set: RunningSet = names.into_iter().collect();
                debug!(running = set.len(), "Runtime listing complete");
                set
            }
            Err(err) => {
                warn!(error = %err, "Runtime listing failed, treating all containers as stopped");
                self.metrics.inc_runtime_probe_failures();
                RunningSet::default()
            }
        }
    }
}
