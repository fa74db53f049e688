//! dynamic-config service entry point.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use dynamic_config::config::{load_config, ServiceConfig};
use dynamic_config::identity::{DisabledIssuer, HttpTokenIssuer, TokenIssuer};
use dynamic_config::lifecycle::{wait_for_signal, Shutdown};
use dynamic_config::notifications::StaticCoordinator;
use dynamic_config::observability::{logging, metrics};
use dynamic_config::registration::StaleSweeper;
use dynamic_config::store::MemoryStore;
use dynamic_config::{ConfigService, HttpServer};

#[derive(Parser)]
#[command(name = "dynamic-config", version, about = "Dynamic configuration service")]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long, env = "DYNAMIC_CONFIG_FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };

    logging::init(Some(&config.observability.log_level));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dynamic-config starting");
    tracing::info!(
        environment = %config.environment.name,
        deployment_id = %config.environment.deployment_id,
        bind_address = %config.listener.bind_address,
        primary = config.node.primary,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(match &config.store.snapshot_path {
        Some(path) => MemoryStore::load_from_file(Path::new(path))?,
        None => MemoryStore::new(None),
    });

    let issuer: Arc<dyn TokenIssuer> = if config.identity.enabled {
        Arc::new(HttpTokenIssuer::new(
            config.identity.clone(),
            config.environment.deployment_id.clone(),
        )?)
    } else {
        tracing::warn!("Identity service disabled; admin tokens cannot be minted");
        Arc::new(DisabledIssuer)
    };

    let instance_id = if config.node.instance_id.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        config.node.instance_id.clone()
    };
    let coordinator = Arc::new(StaticCoordinator::new(instance_id, config.node.primary));

    let service = Arc::new(ConfigService::build(&config, store.clone(), issuer, coordinator).await?);

    let shutdown = Shutdown::new();
    let mut workers = Vec::new();
    workers.push(tokio::spawn(service.dispatcher().clone().run(shutdown.subscribe())));
    workers.push(tokio::spawn(
        StaleSweeper::new(service.ledger().clone(), config.registration.clone()).run(shutdown.subscribe()),
    ));
    if config.store.snapshot_interval_secs > 0 {
        workers.push(tokio::spawn(store.clone().run_snapshots(
            Duration::from_secs(config.store.snapshot_interval_secs),
            shutdown.subscribe(),
        )));
    }

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config, service);
    let served = server.run(listener, shutdown.signalled()).await;

    shutdown.trigger();
    for worker in workers {
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "Background task ended abnormally");
        }
    }
    if let Err(e) = store.save_to_file() {
        tracing::error!(error = %e, "Failed to save final snapshot");
    }

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}
