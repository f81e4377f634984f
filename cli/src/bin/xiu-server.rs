#![forbid(unsafe_code)]

//! XIU server - answers PSK-authenticated handshakes over UDP.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use xiu::config;
use xiu::server::TunnelServer;

#[derive(Parser, Debug)]
#[command(name = "xiu-server")]
#[command(about = "XIU server - answers PSK-authenticated handshakes over UDP")]
struct Args {
    /// Config file
    #[arg(long, default_value = "server.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = format!("{},tokio=warn", args.log_level);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting xiu-server v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_server(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let server = TunnelServer::bind(config).await.context("starting server")?;

    server.run().await;
    Ok(())
}
