//! # homectld
//!
//! Loads the configuration, opens the sample database, deploys the
//! configured commands and sensors and runs until interrupted. On unix a
//! `SIGHUP` reloads the configuration file and redeploys; a failing
//! redeploy leaves the running generation untouched.

use std::path::Path;
use std::sync::Arc;

use homectl_adapter_storage_sqlite_sqlx as storage;
use homectl_adapter_virtual::VirtualDevices;
use homectl_app::controller::Controller;
use homectl_app::status_cache::StatusCache;
use homectld::config::{self, Config};
use homectld::deployment::ConfigModelBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config::config_path();
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = storage::Config::new(config.database_url()).build().await?;

    // Processors and cache
    let chain = homectld::processor_chain(&config, db.sample_store());
    let controller = Controller::new(Arc::new(StatusCache::new(chain)));

    // Deployment
    let devices = Arc::new(VirtualDevices::new());
    controller
        .deploy(&ConfigModelBuilder::new(&config, Arc::clone(&devices)))
        .await?;
    tracing::info!(path = %config_path.display(), "homectld running");

    run_until_interrupted(&controller, &config_path, &devices).await?;

    controller.shutdown().await;
    db.close().await;
    tracing::info!("homectld stopped");
    Ok(())
}

#[cfg(unix)]
async fn run_until_interrupted(
    controller: &Controller,
    config_path: &Path,
    devices: &Arc<VirtualDevices>,
) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => return result,
            _ = hangup.recv() => redeploy(controller, config_path, devices).await,
        }
    }
}

#[cfg(not(unix))]
async fn run_until_interrupted(
    _controller: &Controller,
    _config_path: &Path,
    _devices: &Arc<VirtualDevices>,
) -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg_attr(not(unix), allow(dead_code))]
async fn redeploy(controller: &Controller, config_path: &Path, devices: &Arc<VirtualDevices>) {
    tracing::info!(path = %config_path.display(), "reloading configuration");
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = ?err, "configuration rejected, keeping current deployment");
            return;
        }
    };
    if let Err(err) = controller
        .deploy(&ConfigModelBuilder::new(&config, Arc::clone(devices)))
        .await
    {
        tracing::error!(error = ?err, "redeploy failed, keeping current deployment");
    }
}
