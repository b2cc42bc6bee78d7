//! # SkyIsle Server
//!
//! Headless island server. Loads `skyisle.toml` (or the file named by
//! `SKYISLE_CONFIG`), the island templates and the parcel snapshot, then
//! ticks the world and the island manager until interrupted.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod server;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{ServerConfig, CONFIG_FILE};
use crate::server::Server;

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("skyisle=info".parse()?))
        .init();

    info!("SkyIsle starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let path = std::env::var("SKYISLE_CONFIG").unwrap_or_else(|_| CONFIG_FILE.to_string());
    let config = ServerConfig::load_from(&path);

    // World access is single-threaded; everything runs on this thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let mut server = Server::new(config)?;
        server.bootstrap().await?;
        server
            .run(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {e}");
                }
            })
            .await
    })?;

    info!("SkyIsle shutdown complete");
    Ok(())
}
