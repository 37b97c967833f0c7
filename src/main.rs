//! Metrics zipper: fans metric queries out to backend groups.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                  ZIPPER                       │
//!   GET /{group}/...  │  ┌────────┐   ┌──────────┐   ┌────────────┐  │
//!   ──────────────────┼─▶│  http  │──▶│ dispatch │──▶│ round_robin│  │
//!                     │  │ server │   │  query   │   │   picker   │  │
//!                     │  └────────┘   └────┬─────┘   └────────────┘  │
//!                     │                    │ per try                  │
//!                     │                    ▼                          │
//!                     │              ┌──────────┐   ┌───────────┐    │      ┌─────────┐
//!                     │              │ limiter  │──▶│ transport │────┼─────▶│ replica │
//!                     │              │  slot    │   │  (hyper)  │    │      └─────────┘
//!                     │              └──────────┘   └───────────┘    │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use metrics_zipper::config::{load_config, ZipperConfig};
use metrics_zipper::observability::{logging, metrics};
use metrics_zipper::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "metrics-zipper")]
#[command(about = "Fan-out dispatcher for metric backends", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ZipperConfig::default(),
    };

    logging::init_logging(&config.logging)?;
    tracing::info!("metrics-zipper v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        groups = config.groups.len(),
        max_concurrent_per_group = config.limiter.max_concurrent_per_group,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    shutdown.trigger_on_ctrl_c().await?;
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
