// src/main.rs

//! The entry point that boots the shard runtime and shared state.

use anyhow::{Context, Result};
use spinelshard::config::Config;
use spinelshard::core::metrics::gather_metrics;
use spinelshard::core::state::ServerState;
use std::env;
use tracing::{debug, error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    run_app().await
}

async fn run_app() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("spinelshard version {VERSION}");
        return Ok(());
    }

    // It can be provided via a --config flag; otherwise, it defaults to "config.toml".
    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("config.toml");

    let mut config = match Config::from_file(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{config_path}\": {e:#}");
            std::process::exit(1);
        }
    };

    if let Some(index) = args.iter().position(|arg| arg == "--shards") {
        let Some(count) = args.get(index + 1).and_then(|s| s.parse::<usize>().ok()) else {
            eprintln!("--shards requires a positive number");
            std::process::exit(1);
        };
        config.shards.count = count;
        config.validate()?;
    }

    let initial_log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::new(initial_log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true),
        )
        .init();

    info!("Starting spinelshard {}", VERSION);
    let state = ServerState::initialize(config).context("Failed to initialize server state")?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutdown signal received");
    state.shutdown();
    debug!("Final metrics:\n{}", gather_metrics());
    Ok(())
}
