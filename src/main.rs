//! Edge redirect router.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                 SITE EDGE                    │
//!   Client Request     │  ┌──────────┐   ┌────────────┐   ┌─────────┐ │
//!   ───────────────────┼─▶│  http    │──▶│   edge     │──▶│ routing │ │
//!                      │  │middleware│   │  router    │   │ resolve │ │
//!                      │  └────┬─────┘   └─────┬──────┘   └────┬────┘ │
//!   308 / 301 Location │       │               │               │      │
//!   ◀──────────────────┼───────┘               │          ┌────▼────┐ │
//!                      │                       │          │  cache  │◀┼── CMS
//!   Origin Response    │  ┌──────────┐         │          └─────────┘ │
//!   ◀──────────────────┼──│ upstream │◀────────┘  x-site-* headers    │
//!                      │  └──────────┘                                │
//!                      │   config · observability · admin · lifecycle │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use site_edge::config::load_config;
use site_edge::lifecycle::signals::spawn_signal_handler;
use site_edge::observability::{logging, metrics};
use site_edge::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "site-edge")]
#[command(about = "Edge redirect router", long_about = None)]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long, env = "SITE_EDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "site-edge starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.upstream.origin,
        rule_source = ?config.redirects.source,
        cache_ttl_secs = config.redirects.cache_ttl_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let shutdown_rx = shutdown.subscribe();
    spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
