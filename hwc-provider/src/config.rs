//! Provider configuration: API endpoints, credentials and wait timeouts.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::driver::Timeouts;

/// Connection settings for the RTS and CCE APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub region: String,
    pub project_id: String,
    #[serde(skip_serializing, default)]
    pub token: String,
    /// Override for the CCE endpoint (defaults to the region's public endpoint).
    #[serde(default)]
    pub cce_endpoint: Option<String>,
    /// Override for the RTS endpoint, including version and project.
    #[serde(default)]
    pub orchestration_endpoint: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    pub fn cce_endpoint(&self) -> String {
        self.cce_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://cce.{}.myhuaweicloud.com", self.region))
    }

    pub fn orchestration_endpoint(&self) -> String {
        self.orchestration_endpoint.clone().unwrap_or_else(|| {
            format!(
                "https://rts.{}.myhuaweicloud.com/v1/{}",
                self.region, self.project_id
            )
        })
    }
}

/// Per-operation timeout overrides in seconds; unset values keep the driver defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub create_secs: Option<u64>,
    pub update_secs: Option<u64>,
    pub delete_secs: Option<u64>,
    pub delay_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
}

impl TimeoutConfig {
    pub fn apply(&self, base: Timeouts) -> Timeouts {
        let secs = |v: Option<u64>, d: Duration| v.map(Duration::from_secs).unwrap_or(d);
        Timeouts {
            create: secs(self.create_secs, base.create),
            update: secs(self.update_secs, base.update),
            delete: secs(self.delete_secs, base.delete),
            delay: secs(self.delay_secs, base.delay),
            poll_interval: secs(self.poll_interval_secs, base.poll_interval),
        }
    }
}

/// Complete provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Config {
    /// Load a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

fn default_request_timeout() -> u64 {
    60
}
