//! # pylon-relay
//!
//! Relay hub binary — wires config, logging, and metrics together and
//! starts the WebSocket server.

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use pylon_server::config::ServerConfig;
use pylon_server::metrics;
use pylon_server::server::RelayServer;
use tracing_subscriber::EnvFilter;

/// Pylon relay hub server.
#[derive(Parser, Debug)]
#[command(name = "pylon-relay", about = "Pylon binary message relay hub")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "9464")]
    port: u16,

    /// Maximum concurrent peer connections.
    #[arg(long)]
    max_connections: Option<usize>,

    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long)]
    log_json: bool,
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the default
/// `info` level.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_json);

    let mut config = ServerConfig {
        host: args.host,
        port: args.port,
        ..ServerConfig::default()
    };
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }

    let metrics_handle = metrics::install_recorder();
    let server = RelayServer::new(config, metrics_handle);

    let (addr, handle) = server.listen().await.context("failed to bind server")?;
    tracing::info!("pylon relay listening on ws://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    server.shutdown().trigger();
    let _ = handle.await;
    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["pylon-relay"]);
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, 9464);
        assert!(cli.max_connections.is_none());
        assert!(!cli.log_json);
    }

    #[test]
    fn cli_overrides() {
        let cli = Cli::parse_from([
            "pylon-relay",
            "--host",
            "127.0.0.1",
            "--port",
            "0",
            "--max-connections",
            "4",
            "--log-json",
        ]);
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 0);
        assert_eq!(cli.max_connections, Some(4));
        assert!(cli.log_json);
    }
}
