use anyhow::Context;
use clap::Parser;
use ndvi_core::{Config, platform::auth::SERVICE_ACCOUNT_ENV};
use ndvi_server::{build_state, router};
use std::{net::IpAddr, path::PathBuf};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "ndvi-server", version, about = "Vegetation health lookup service")]
pub struct Cli {
    /// TOML config file. Defaults to $NDVI_CONFIG, then the platform config dir.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to bind; overrides the config file.
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port to listen on; overrides the config file and $PORT.
    #[arg(long)]
    pub port: Option<u16>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        config.apply_env(|key| std::env::var(key).ok())?;

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        let state = build_state(&config, std::env::var(SERVICE_ACCOUNT_ENV).ok()).await;

        let addr = config.server.listen_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        info!(%addr, "Server running");

        axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
