use crate::manifest::Manifest;
use anyhow::{Context, Result};
use router_core::{Config, ConfigOptions, MapWriter};
use std::path::PathBuf;
use tracing::{debug, info};

/// Result of a reconciliation cycle
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SyncOutcome {
    /// The compiled configuration differs from the previous cycle
    Changed,
    Unchanged,
}

/// Rebuilds the configuration from a manifest and keeps the last one
/// around to detect changes
pub struct Reconciler<W: MapWriter> {
    maps_dir: PathBuf,
    writer: W,
    previous: Option<Config>,
}

impl<W: MapWriter> Reconciler<W> {
    pub fn new(maps_dir: PathBuf, writer: W) -> Self {
        Self {
            maps_dir,
            writer,
            previous: None,
        }
    }

    /// Populate a fresh configuration, sync it and compile all maps
    pub fn compile(&self, manifest: &Manifest) -> Result<Config> {
        let mut config = Config::new(ConfigOptions {
            maps_dir: self.maps_dir.clone(),
        });
        manifest.populate(&mut config);
        config.sync_config();
        // frontend first: a host that fails to compile leaves nothing written
        config
            .build_frontend_group(&self.writer)
            .context("Failed to build frontend maps")?;
        config
            .build_backend_maps(&self.writer)
            .context("Failed to build backend maps")?;
        Ok(config)
    }

    pub fn reconcile(&mut self, manifest: &Manifest) -> Result<SyncOutcome> {
        let config = self.compile(manifest)?;
        let outcome = match &self.previous {
            Some(previous) if previous.equals(&config) => SyncOutcome::Unchanged,
            _ => SyncOutcome::Changed,
        };
        match outcome {
            SyncOutcome::Changed => info!(
                "Configuration changed: {} hosts, {} backends",
                config.hosts().items.len(),
                config.backends().len()
            ),
            SyncOutcome::Unchanged => debug!("Configuration unchanged"),
        }
        self.previous = Some(config);
        Ok(outcome)
    }

    pub fn current(&self) -> Option<&Config> {
        self.previous.as_ref()
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}
