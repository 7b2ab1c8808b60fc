use anyhow::Result;
use router_core::FileMapWriter;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod manifest;
mod reconciler;

use config::{ControllerConfig, LogFormat};
use manifest::Manifest;
use reconciler::{Reconciler, SyncOutcome};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn run_cycle(config: &ControllerConfig, reconciler: &mut Reconciler<FileMapWriter>) -> Result<SyncOutcome> {
    let manifest = Manifest::load(&config.manifest)?;
    reconciler.reconcile(&manifest)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ControllerConfig::from_env()?;
    init_tracing(config.log_format);

    info!(
        "Starting router-controller: manifest={}, maps_dir={}",
        config.manifest.display(),
        config.maps_dir.display()
    );

    let mut reconciler = Reconciler::new(config.maps_dir.clone(), FileMapWriter);

    if config.sync_interval.is_zero() {
        run_cycle(&config, &mut reconciler)?;
        info!("Maps written, exiting");
        return Ok(());
    }

    let mut ticker = tokio::time::interval(config.sync_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_cycle(&config, &mut reconciler) {
                    error!("Reconciliation failed: {:#}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, exiting...");
                break;
            }
        }
    }

    Ok(())
}
