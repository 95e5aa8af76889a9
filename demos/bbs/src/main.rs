use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use termgate::prelude::*;
use tracing_subscriber::EnvFilter;

/// Run a Termgate bulletin board.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file. Built-in defaults are used if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `server.port`.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let server = TermgateServer::builder()
        .config(config)
        .build()
        .await
        .context("starting server")?;

    tracing::info!("connect with: telnet {}", server.local_addr()?);
    server.run().await?;
    Ok(())
}
