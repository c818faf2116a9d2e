// src/main.rs
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crabkv::{config::Cli, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG 未设置时默认 info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Cli::parse().into_config()?;
    server::run(cfg).await
}
