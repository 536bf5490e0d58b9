//! typereg HTTP server.
//!
//! Serves the instance CRUD endpoints over the process-wide registry.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "typereg-http")]
#[command(about = "HTTP server for the typereg type registry")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// JSON file of Reg declarations applied before serving
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting typereg HTTP server");

    let registry = typereg::global_registry();
    typereg_http::register_builtin_types(&registry)?;

    if let Some(seed) = &args.seed {
        typereg_http::load_seed(seed)?;
    }

    let addr = typereg_http::start_server(registry, &args.host, args.port).await?;

    // Machine-readable port line for launchers
    println!("TYPEREG_PORT={}", addr.port());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
