//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the span exporter chain from configuration
//! - Build the per-service telemetry object
//!
//! # Design Decisions
//! - Fail fast on configuration errors; logging is initialized before
//!   anything here runs
//! - A collector that cannot be set up degrades to log-only export

use std::sync::Arc;
use std::time::Duration;

use crate::config::ObservabilityConfig;
use crate::observability::trace::{
    CollectorExporter, CollectorSettings, FanoutExporter, LogExporter, SpanExporter,
};
use crate::observability::Telemetry;

/// Log exporter, plus an OTLP collector exporter when an endpoint is configured.
///
/// Must be called inside a multi-threaded Tokio runtime when a collector is
/// configured.
pub fn build_exporter(config: &ObservabilityConfig, service: &str) -> Arc<dyn SpanExporter> {
    let log: Arc<dyn SpanExporter> = Arc::new(LogExporter);
    let Some(endpoint) = &config.trace_endpoint else {
        return log;
    };

    let settings = CollectorSettings {
        endpoint: endpoint.clone(),
        batch_size: config.export_batch_size,
        queue_size: config.export_queue_size,
        timeout: Duration::from_millis(config.export_timeout_ms),
    };
    match CollectorExporter::spawn(service, &settings) {
        Ok(collector) => Arc::new(FanoutExporter::new(vec![log, Arc::new(collector)])),
        Err(e) => {
            tracing::warn!(endpoint = %endpoint, error = %e, "Span collector unavailable, logging spans only");
            log
        }
    }
}

pub fn build_telemetry(config: &ObservabilityConfig, service: &str) -> Telemetry {
    Telemetry::new(&config.app_name, service, build_exporter(config, service))
}
