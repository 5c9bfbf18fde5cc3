//! Catalog data model and status report types

use serde::{Deserialize, Serialize};

/// Binary liveness of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Online,
    Offline,
}

impl Status {
    /// Returns true if the entry is reachable
    pub fn is_online(&self) -> bool {
        matches!(self, Status::Online)
    }

    pub fn from_running(running: bool) -> Self {
        if running {
            Status::Online
        } else {
            Status::Offline
        }
    }
}

/// A dashboard application backed by a managed container
///
/// Configuration input is snake_case (the config layer lowercases
/// keys); the wire format is camelCase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct AppDescriptor {
    /// Unique identifier within the catalog
    pub id: String,
    /// Display name shown on the dashboard card
    pub name: String,
    pub description: String,
    /// Icon reference (emoji or asset key)
    pub icon: String,
    /// Click-through URL of the app frontend
    pub url: String,
    /// Name of the container whose presence determines liveness
    pub container_name: String,
    /// Primary card color
    pub color: String,
}

/// An infrastructure service, either container-backed or probed
/// over HTTP when `endpoint` is set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct ServiceDescriptor {
    pub name: String,
    pub container_name: String,
    /// Base URL of an external health endpoint. When present the
    /// service is classified by `GET {endpoint}/status` instead of
    /// container membership. Configuration input only, never
    /// serialized into reports.
    #[serde(default, skip_serializing)]
    pub endpoint: Option<String>,
}

impl ServiceDescriptor {
    /// Returns true when liveness comes from an external HTTP check
    pub fn is_endpoint_backed(&self) -> bool {
        self.endpoint.is_some()
    }
}

/// Ordered catalog of apps and services, loaded once at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub apps: Vec<AppDescriptor>,
    #[serde(default)]
    pub services: Vec<ServiceDescriptor>,
}

/// Status report entry for an app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppStatus {
    #[serde(flatten)]
    pub app: AppDescriptor,
    pub status: Status,
}

/// Status report entry for a service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub name: String,
    pub container_name: String,
    pub status: Status,
}

/// Combined report, one entry per catalog entry, catalog order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullStatus {
    pub apps: Vec<AppStatus>,
    pub services: Vec<ServiceStatus>,
}
