//! tracepipe service binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌────────────────────────────┐        ┌──────────────────────────────┐
//!   Client           │          GATEWAY           │        │           BACKEND            │
//!   ─────────────────┼─▶ session ─▶ root span     │        │                              │
//!   Cookie?          │              │             │ trace- │  extract ─▶ child span       │
//!                    │              ▼             │ parent │              │               │
//!                    │         client span ───────┼────────┼─▶ delay ─▶ classify          │
//!                    │              │             │baggage │              │               │
//!   ◀────────────────┼── body or fallback ◀───────┼────────┼── 200 | 408 ◀ telemetry      │
//!   Set-Cookie?      │   + telemetry              │        │                              │
//!                    │                            │        │  PUT errorGenerator          │
//!                    └────────────────────────────┘        └──────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use tracepipe::backend::{BackendServer, BackendState};
use tracepipe::config;
use tracepipe::gateway::{GatewayServer, GatewayState};
use tracepipe::lifecycle::{signals, startup, Shutdown};
use tracepipe::observability::{logging, Telemetry};
use tracepipe::{BACKEND_SERVICE, GATEWAY_SERVICE};

#[derive(Parser)]
#[command(name = "tracepipe")]
#[command(about = "Correlated gateway and backend services", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    service: Service,
}

#[derive(Subcommand)]
enum Service {
    /// Run the public gateway
    Gateway,
    /// Run the internal backend
    Backend,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::resolve(cli.config.as_deref())?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tracepipe starting");

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move { signals::shutdown_on_signal(&signal_shutdown).await });

    match cli.service {
        Service::Gateway => {
            let telemetry = startup::build_telemetry(&config.observability, GATEWAY_SERVICE);
            let state = GatewayState::from_config(&config.gateway, telemetry.clone())?;
            let listener = TcpListener::bind(&config.gateway.bind_address).await?;
            let server = GatewayServer::new(state);
            server.run(listener, shutdown.subscribe()).await?;
            flush_spans(telemetry).await?;
        }
        Service::Backend => {
            let telemetry = startup::build_telemetry(&config.observability, BACKEND_SERVICE);
            let state = BackendState::from_config(&config.backend, telemetry.clone());
            let listener = TcpListener::bind(&config.backend.bind_address).await?;
            let server = BackendServer::new(state);
            server.run(listener, shutdown.subscribe()).await?;
            flush_spans(telemetry).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Exporter shutdown blocks on the collector, so it runs off the runtime.
async fn flush_spans(telemetry: Telemetry) -> Result<(), tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || telemetry.shutdown()).await
}
