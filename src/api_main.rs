//! Minestars API Server Binary
//!
//! Serves the player economy over HTTP from a RocksDB data directory.

use clap::Parser;
use minestars::{
    api::{server::init_tracing, ApiServer},
    config::{ConfigLoader, LogLevel},
    economy::Economy,
};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "minestars-api")]
#[command(about = "Minestars player economy API server", long_about = None)]
struct Args {
    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// API server host
    #[arg(long)]
    host: Option<String>,

    /// API server port
    #[arg(long)]
    port: Option<u16>,

    /// Database directory
    #[arg(long)]
    db_path: Option<String>,

    /// Allowed CORS origins (comma-separated, use * for all)
    #[arg(long)]
    cors_origins: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Default log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    dump_config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::new().with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;

    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(db_path) = args.db_path {
        config.storage.data_directory = db_path;
    }
    if let Some(origins) = args.cors_origins {
        config.api.allowed_origins = origins.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Some(timeout) = args.timeout {
        config.api.request_timeout_secs = timeout;
    }
    if let Some(level) = args.log_level {
        config.monitoring.log_level = level;
    }
    config.validate()?;

    if let Some(path) = args.dump_config {
        loader.save(&config, &path)?;
        println!("Configuration written to {}", path);
        return Ok(());
    }

    init_tracing(config.monitoring.log_level.as_filter());

    let economy = Arc::new(Economy::open(&config)?);
    ApiServer::new(config, economy).run().await?;

    Ok(())
}
