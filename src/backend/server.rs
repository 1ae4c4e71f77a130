//! Backend HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the main, admin and metrics endpoints
//! - Own the shared per-service state
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::backend::classifier::{DurationSource, ExponentialSource};
use crate::backend::handlers::{
    get_error_generator, main_handler, metrics_handler, put_error_generator,
    ERROR_GENERATOR_PATH, MAIN_PATH, METRICS_PATH,
};
use crate::backend::threshold::LiveThreshold;
use crate::config::BackendConfig;
use crate::observability::Telemetry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct BackendState {
    pub telemetry: Telemetry,
    pub threshold: Arc<LiveThreshold>,
    pub latency: Arc<dyn DurationSource>,
}

impl BackendState {
    pub fn new(
        telemetry: Telemetry,
        threshold: Arc<LiveThreshold>,
        latency: Arc<dyn DurationSource>,
    ) -> Self {
        Self {
            telemetry,
            threshold,
            latency,
        }
    }

    /// State for a configured backend using exponential latency draws.
    pub fn from_config(config: &BackendConfig, telemetry: Telemetry) -> Self {
        Self::new(
            telemetry,
            Arc::new(LiveThreshold::new(config.max_response_ms)),
            Arc::new(ExponentialSource::new(config.mean_latency_ms)),
        )
    }
}

/// Build the backend router.
pub fn build_router(state: BackendState) -> Router {
    Router::new()
        .route(MAIN_PATH, get(main_handler))
        .route(
            ERROR_GENERATOR_PATH,
            get(get_error_generator).put(put_error_generator),
        )
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// HTTP server for the backend service.
pub struct BackendServer {
    router: Router,
    state: BackendState,
}

impl BackendServer {
    pub fn new(state: BackendState) -> Self {
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
            threshold_ms = self.state.threshold.millis(),
            "Backend listening"
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
            "Backend stopped"
        );
        Ok(())
    }
}
