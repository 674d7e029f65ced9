//! CLI entry point - the composition root.
//!
//! Loads and validates the configuration, initializes tracing, and runs
//! the server until ctrl-c. A broken config aborts here, before the
//! listener binds.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tailview_axum::bootstrap::{CorsConfig, start_server};
use tailview_core::AppConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tailview", version, about = "Live log streaming server")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the configured listen host.
    #[arg(long)]
    host: Option<String>,

    /// Override the configured listen port.
    #[arg(long)]
    port: Option<u16>,

    /// Serve a built frontend from this directory (SPA fallback).
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    tracing::info!(
        config = %cli.config.display(),
        sources = config.sources.len(),
        "configuration loaded"
    );

    start_server(config, cli.static_dir, &CorsConfig::AllowAll).await
}
