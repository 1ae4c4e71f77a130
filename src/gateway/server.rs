//! Gateway HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the public and metrics endpoints
//! - Hold the backend client and telemetry shared by all requests
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::time::Duration;

use axum::{http::uri::InvalidUri, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::gateway::client::BackendClient;
use crate::gateway::handlers::{metrics_handler, root_handler, METRICS_PATH, ROOT_PATH};
use crate::observability::Telemetry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub telemetry: Telemetry,
    pub client: BackendClient,
}

impl GatewayState {
    pub fn new(telemetry: Telemetry, client: BackendClient) -> Self {
        Self { telemetry, client }
    }

    pub fn from_config(config: &GatewayConfig, telemetry: Telemetry) -> Result<Self, InvalidUri> {
        let client = BackendClient::new(
            &config.backend_url,
            Duration::from_millis(config.request_timeout_ms),
        )?;
        Ok(Self::new(telemetry, client))
    }
}

/// Build the gateway router.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route(ROOT_PATH, get(root_handler))
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// HTTP server for the gateway service.
pub struct GatewayServer {
    router: Router,
    state: GatewayState,
}

impl GatewayServer {
    pub fn new(state: GatewayState) -> Self {
        let router = build_router(state.clone());
        Self { router, state }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.state.client.uri(),
            "Gateway listening"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        let metrics = self.state.telemetry.metrics();
        tracing::info!(
            requests = metrics.requests_total(),
            errors = metrics.errors_total(),
            "Gateway stopped"
        );
        Ok(())
    }
}
