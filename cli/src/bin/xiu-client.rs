#![forbid(unsafe_code)]

//! XIU client - establishes a session with an XIU server and keeps it fresh.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use xiu::client::TunnelClient;
use xiu::config;

#[derive(Parser, Debug)]
#[command(name = "xiu-client")]
#[command(about = "XIU client - establishes a session with an XIU server")]
struct Args {
    /// Config file
    #[arg(long, default_value = "client.yaml")]
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

    info!("Starting xiu-client v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_client(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let server = config.server.clone();
    let client = TunnelClient::connect(config)
        .await
        .with_context(|| format!("connecting to {server}"))?;
    info!(
        server = %client.server_addr(),
        local = %client.local_addr()?,
        "client running"
    );

    let _keepalive = client.spawn_keepalive();
    client.run().await;
    Ok(())
}
