//! Liveness probes against external collaborators
//!
//! Two probe kinds back the aggregator: a container runtime listing
//! (one invocation per aggregation pass) and per-service HTTP health
//! checks. Both carry explicit deadlines; neither ever surfaces an
//! error past this module.

mod endpoint;
mod runtime;

pub use endpoint::{EndpointProbe, DEFAULT_ENDPOINT_TIMEOUT};
pub use runtime::{
    DockerLister, RunningSet, RuntimeError, RuntimeLister, RuntimeProbe, DEFAULT_RUNTIME_TIMEOUT,
};

pub use async_trait::async_trait;
