//! Binary entry point for the relay.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sede_proxy::{AppState, Config, PollPolicy, ReqwestTransport, build_router};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    debug!(?config, "configuration loaded");

    let transport = ReqwestTransport::new(&config.transport_settings())
        .context("failed to build upstream HTTP client")?;
    let state = AppState::new(Arc::new(transport), &config, PollPolicy::default());
    let app = build_router(state);

    let addr = SocketAddr::new(args.bind, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        %addr,
        whitelisted_origins = config.origin_whitelist.len(),
        access_token = config.oauth_client.is_some(),
        "sede-proxy listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
