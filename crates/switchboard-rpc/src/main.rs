//! Switchboard - request-dispatch bridge between HTTP callers and a fleet
//! of long-lived WebSocket workers.
//!
//! Workers attach via `/ws?group=..&name=..` and stay connected; HTTP
//! clients invoke them through `/call` and `/exec`, and the bridge
//! correlates each asynchronous worker reply back to the waiting request.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use switchboard_core::{logging, Registry, ServerConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "switchboard-rpc")]
#[command(about = "Request-dispatch bridge between HTTP callers and WebSocket workers")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = ServerConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = ServerConfig::DEFAULT_HOST)]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(args.debug);

    info!("Starting switchboard");

    let registry = Arc::new(Registry::new());
    let addr = switchboard_rpc::server::start_server(registry, &args.host, args.port).await?;

    info!("switchboard running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
