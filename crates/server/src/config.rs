//! Server configuration
//!
//! Settings come from an optional TOML file (path in
//! `STATUSHUB_CONFIG`, default `statushub.toml`) with
//! `STATUSHUB_`-prefixed environment variables layered on top. The
//! catalog is part of the configuration and is loaded once at startup;
//! the aggregator never re-reads it.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use status_lib::catalog::Catalog;
use status_lib::probe::{DEFAULT_ENDPOINT_TIMEOUT, DEFAULT_RUNTIME_TIMEOUT};

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Port for the status API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Origins allowed to call the API from a browser; "*" allows any
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Container runtime binary used for listings
    #[serde(default = "default_runtime_bin")]
    pub runtime_bin: String,

    /// Deadline for one container runtime listing, in seconds
    #[serde(default = "default_runtime_timeout")]
    pub runtime_timeout_secs: u64,

    /// Deadline for one endpoint health check, in seconds
    #[serde(default = "default_endpoint_timeout")]
    pub endpoint_timeout_secs: u64,

    /// Catalog of apps and services to report on
    #[serde(default)]
    pub catalog: Catalog,
}

fn default_api_port() -> u16 {
    3001
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost".to_string(),
    ]
}

fn default_runtime_bin() -> String {
    "docker".to_string()
}

fn default_runtime_timeout() -> u64 {
    DEFAULT_RUNTIME_TIMEOUT.as_secs()
}

fn default_endpoint_timeout() -> u64 {
    DEFAULT_ENDPOINT_TIMEOUT.as_secs()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            cors_origins: default_cors_origins(),
            runtime_bin: default_runtime_bin(),
            runtime_timeout_secs: default_runtime_timeout(),
            endpoint_timeout_secs: default_endpoint_timeout(),
            catalog: Catalog::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("STATUSHUB_CONFIG").unwrap_or_else(|_| "statushub.toml".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(config::Environment::with_prefix("STATUSHUB"))
            .build()
            .context("Failed to read configuration")?;

        let config: ServerConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject catalogs with duplicate identifiers; startup is the only
    /// place a hard error is allowed
    pub fn validate(&self) -> Result<()> {
        let mut app_ids = HashSet::new();
        for app in &self.catalog.apps {
            if !app_ids.insert(app.id.as_str()) {
                bail!("duplicate app id in catalog: {}", app.id);
            }
        }

        let mut service_names = HashSet::new();
        for service in &self.catalog.services {
            if !service_names.insert(service.name.as_str()) {
                bail!("duplicate service name in catalog: {}", service.name);
            }
        }

        Ok(())
    }
}
