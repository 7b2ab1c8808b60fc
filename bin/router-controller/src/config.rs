//! Controller configuration (env-driven)

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// YAML manifest describing hosts and backends
    pub manifest: PathBuf,
    /// Directory the map files are written to
    pub maps_dir: PathBuf,
    /// Reconciliation period, zero runs a single cycle
    pub sync_interval: Duration,
    pub log_format: LogFormat,
}

impl ControllerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let manifest = lookup("ROUTER_MANIFEST")
            .map(PathBuf::from)
            .context("Missing manifest. Set ROUTER_MANIFEST to the model manifest path.")?;

        let maps_dir = lookup("ROUTER_MAPS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/etc/router/maps"));

        let sync_interval_secs: u64 = lookup("ROUTER_SYNC_INTERVAL_SECS")
            .map(|v| v.parse())
            .transpose()
            .context("ROUTER_SYNC_INTERVAL_SECS must be an integer (seconds).")?
            .unwrap_or(30);

        let log_format = match lookup("ROUTER_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => bail!("Invalid ROUTER_LOG_FORMAT: {}. Must be text or json", other),
        };

        Ok(Self {
            manifest,
            maps_dir,
            sync_interval: Duration::from_secs(sync_interval_secs),
            log_format,
        })
    }
}
