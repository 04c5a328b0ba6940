//! Kubernetes operator for etcd clusters.

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use etcd_operator::config::OperatorConfig;
use etcd_operator::{controller, crds, metrics, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let config = OperatorConfig::parse();
    telemetry::init(&config.log_level);
    config.validate()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting etcd operator");

    let client = kube::Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;

    if config.install_crds {
        crds::install(client.clone())
            .await
            .context("failed to install EtcdCluster CRD")?;
    }

    let shutdown = CancellationToken::new();

    let metrics_task = tokio::spawn(metrics::serve(config.metrics_addr.clone(), shutdown.clone()));

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {e}");
        }
        info!("Shutdown signal received");
        signal.cancel();
    });

    controller::run(client, config.watch_namespace.clone(), shutdown.clone()).await;
    shutdown.cancel();

    metrics_task
        .await
        .context("metrics server panicked")?
        .context("metrics server failed")?;

    info!("etcd operator stopped");
    Ok(())
}
