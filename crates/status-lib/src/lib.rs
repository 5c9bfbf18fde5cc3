//! Core library for the StatusHub backend
//!
//! This crate provides the core functionality for:
//! - Catalog data model (apps, services, status reports)
//! - Container runtime probing
//! - HTTP endpoint health probing
//! - Per-request status aggregation
//! - Probe metrics

pub mod aggregator;
pub mod catalog;
pub mod observability;
pub mod probe;

pub use aggregator::StatusAggregator;
pub use catalog::{
    AppDescriptor, AppStatus, Catalog, FullStatus, ServiceDescriptor, ServiceStatus, Status,
};
pub use observability::StatusMetrics;
pub use probe::{DockerLister, EndpointProbe, RunningSet, RuntimeError, RuntimeLister, RuntimeProbe};
