//! CHRONOS Sync Server - aggregates cognitive telemetry from many agents.

use std::net::IpAddr;
use anyhow::Result;
use chronos_storage::JsonAggregateStorage;
use chronos_sync::config::{DEFAULT_DATA_DIR, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};
use chronos_sync::ServerConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chronos-sync")]
#[command(about = "Aggregate cognitive telemetry from multiple agents", long_about = None)]
struct Cli {
    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0", env = "CHRONOS_HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "CHRONOS_PORT")]
    port: u16,

    /// Data directory
    #[arg(short, long, default_value = DEFAULT_DATA_DIR, env = "CHRONOS_DATA_DIR")]
    data_dir: std::path::PathBuf,

    /// Largest accepted request body in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        data_dir: cli.data_dir,
        max_body_bytes: cli.max_body_bytes,
    };

    let storage = JsonAggregateStorage::new(&config.data_dir).await?;
    chronos_sync::serve(&config, storage).await?;
    Ok(())
}
