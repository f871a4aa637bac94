use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use edge_router::config::Config;
use edge_router::proxy::{ProxyHandler, RouteTable};
use edge_router::server;

#[derive(Parser)]
#[command(name = "edge-router", version, about = "Path-based edge router for a backend and a static frontend")]
struct Cli {
    /// YAML config file (defaults to $EDGE_ROUTER_CONFIG, then built-in values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        cfg.server.listen_addr = listen;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();

    let routes = RouteTable::from_config(&cfg.routing).context("Invalid routing config")?;
    tracing::info!(
        backend = routes.backend_origin(),
        frontend = routes.frontend_origin(),
        paths = ?routes.backend_paths(),
        "Routing table loaded"
    );
    let handler = Arc::new(ProxyHandler::new(routes, &cfg.upstream)?);

    let listener = server::listener::bind(&cfg.server.listen_addr).await?;
    server::listener::run(listener, handler, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    })
    .await
}
