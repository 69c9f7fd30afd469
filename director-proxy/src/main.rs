//! Process bootstrap: parse CLI flags, load configuration, install
//! tracing, start the routing-config watcher, and run the ingress server
//! until shutdown.
//!
//! A thin `anyhow`-wrapped `main` that sets up logging first, then hands
//! off to long-running tasks.

use std::sync::Arc;

use clap::Parser as _;
use director_core::{reconfigure, Director};
use director_proxy::cluster_client::{RoutingConfigSource, WatchedFileConfigSource};
use director_proxy::config::{Cli, ProxyConfig};
use director_proxy::server::{shutdown_signal, wait_for_ctrl_c, Server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ProxyConfig::load(&cli.config).await?;

    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    install_tracing(log_level);

    tracing::info!(listen_address = %config.listen_address, "starting director-proxy");

    let director = Arc::new(Director::new());

    let mut source = WatchedFileConfigSource::new(config.routing_config_path.clone(), config.poll_interval());
    let reconfig_director = director.clone();
    tokio::spawn(async move {
        while let Some(routing_config) = source.recv().await {
            reconfigure::upgrade(&reconfig_director, &routing_config).await;
        }
        tracing::warn!("routing config source exhausted, no further reconfigurations will occur");
    });

    let (shutdown_tx, shutdown_rx) = shutdown_signal();
    tokio::spawn(wait_for_ctrl_c(shutdown_tx));

    let server = Server::new(director);
    server.run_with_shutdown(&config.listen_address, shutdown_rx).await?;

    tracing::info!("director-proxy shut down cleanly");
    Ok(())
}

fn install_tracing(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
