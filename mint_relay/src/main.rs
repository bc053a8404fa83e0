use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;

use mint_relay::{build_router, AppState, RelayConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Server-side mint relay for the Nova concierge")]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = RelayConfig::load().context("Failed to load relay configuration")?;
    let port = args.port.unwrap_or(config.port);
    log::info!("🚀 Starting mint relay (upstream {})", config.api_base);

    let state = AppState::new(config)?;
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!("🎧 Mint relay listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
