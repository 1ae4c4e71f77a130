//! Per-service telemetry emitter.
//!
//! Bundles the counters, the tracer and the outcome log so a handler reports a
//! finished request with a single `conclude` call.

use std::sync::Arc;
use std::time::Duration;

use crate::observability::logging;
use crate::observability::metrics::ServiceMetrics;
use crate::observability::trace::{CorrelationContext, Span, SpanExporter, Tracer};
use crate::outcome::Outcome;

/// Telemetry sinks for one service, built once at start-up and shared by
/// every request.
#[derive(Clone)]
pub struct Telemetry {
    metrics: ServiceMetrics,
    tracer: Tracer,
}

impl Telemetry {
    pub fn new(app: &str, service: &str, exporter: Arc<dyn SpanExporter>) -> Self {
        Self {
            metrics: ServiceMetrics::new(app, service),
            tracer: Tracer::new(service, exporter),
        }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    pub fn record_request(&self, _ctx: &CorrelationContext) {
        self.metrics.record_request();
    }

    pub fn record_error(&self, _ctx: &CorrelationContext) {
        self.metrics.record_error();
    }

    pub fn log_outcome(&self, ctx: &CorrelationContext, outcome: &Outcome, duration: Duration) {
        logging::log_outcome(ctx, outcome, duration);
    }

    /// Flush buffered spans. Blocks; call once, after the server stops.
    pub fn shutdown(&self) {
        self.tracer.shutdown();
    }

    /// Report a finished request and close its span.
    ///
    /// Increments the request counter, the error counter iff `outcome` is not
    /// a success, writes the outcome log record and ends `span` with the
    /// matching status.
    pub fn conclude(
        &self,
        ctx: &CorrelationContext,
        mut span: Span,
        outcome: &Outcome,
        duration: Duration,
    ) {
        self.record_request(ctx);
        if !outcome.is_success() {
            self.record_error(ctx);
        }
        span.set_attribute("outcome", outcome.tag());
        span.set_attribute("duration_ms", duration.as_secs_f64() * 1000.0);
        self.log_outcome(ctx, outcome, duration);
        span.end(outcome.span_status());
    }
}
