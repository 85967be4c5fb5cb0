//! Quote server.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                   QUOTE SERVER                    │
//!                        │                                                   │
//!   GET /cotacao         │  ┌──────────┐   ┌──────────────────────────────┐  │
//!   ─────────────────────┼─▶│   http   │──▶│ pipeline (request budget)    │  │
//!                        │  │  server  │   │                              │  │
//!                        │  └──────────┘   │  race ──┬─▶ source A ────────┼──┼──▶ upstream
//!                        │                 │ (outer) └─▶ source B ────────┼──┼──▶ upstream
//!                        │                 │                              │  │
//!                        │                 │  persist (own budget) ───────┼──┼──▶ SQLite
//!                        │                 └──────────────────────────────┘  │
//!                        │                                                   │
//!                        │  config (TOML, hot reload) · observability ·      │
//!                        │  lifecycle (signals, graceful shutdown)           │
//!                        └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use quote_race::config::{load_config, ConfigWatcher, ServerConfig};
use quote_race::lifecycle::{wait_for_signal, Shutdown};
use quote_race::observability::{init_logging, metrics};
use quote_race::HttpServer;

#[derive(Parser)]
#[command(name = "quote-race")]
#[command(about = "USD-BRL quote server racing upstream sources", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!("quote-race v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_ms = config.timeouts.request_ms,
        race_per_task_ms = config.race.per_task_ms,
        race_outer_ms = config.race.outer_ms,
        persistence_ms = config.persistence.budget_ms,
        sources = config.sources.len(),
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

    let server = HttpServer::new(&config)?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), rx)
        }
        None => {
            let (_tx, rx) = mpsc::unbounded_channel();
            (None, rx)
        }
    };

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, config_updates, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
