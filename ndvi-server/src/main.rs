//! Binary crate for the `ndvi-server` HTTP service.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and layering configuration
//! - Establishing the Earth Engine session once at startup
//! - Serving the router from `ndvi_server`

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // No .env file is fine; the variables may come from the real environment.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ndvi_server=info,ndvi_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
