//! Backend request lifecycle.
//!
//! ```text
//! Received → Delaying → Classified{Success|Timeout} → TelemetryEmitted → ResponseSent
//! ```
//!
//! Each state is its own type and each transition consumes the previous one,
//! so a handler cannot skip a step or reclassify a request.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::backend::classifier::{classify, DurationSource};
use crate::backend::threshold::LiveThreshold;
use crate::observability::trace::{CorrelationContext, Span};
use crate::observability::Telemetry;
use crate::outcome::Outcome;

/// Body returned on success.
pub const GREETING: &str = "Hello world from the backend\n";

/// Request accepted, span open, nothing classified yet.
pub struct Received {
    ctx: CorrelationContext,
    span: Span,
}

impl Received {
    pub fn new(ctx: CorrelationContext, span: Span) -> Self {
        Self { ctx, span }
    }

    /// Run the simulated work and classify it.
    pub async fn delay(self, source: &dyn DurationSource, threshold: &LiveThreshold) -> Classified {
        let (duration, outcome) = classify(source, threshold).await;
        Classified {
            ctx: self.ctx,
            span: self.span,
            duration,
            outcome,
        }
    }
}

/// Outcome decided; fixed from here on.
pub struct Classified {
    ctx: CorrelationContext,
    span: Span,
    duration: Duration,
    outcome: Outcome,
}

impl Classified {
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Counters, log record and span end.
    pub fn emit(self, telemetry: &Telemetry) -> TelemetryEmitted {
        telemetry.conclude(&self.ctx, self.span, &self.outcome, self.duration);
        TelemetryEmitted {
            outcome: self.outcome,
        }
    }
}

/// Telemetry written and span closed; only the response is left.
#[derive(Debug)]
pub struct TelemetryEmitted {
    outcome: Outcome,
}

impl TelemetryEmitted {
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }
}

impl IntoResponse for TelemetryEmitted {
    fn into_response(self) -> Response {
        match self.outcome {
            Outcome::Success => (StatusCode::OK, GREETING).into_response(),
            _ => StatusCode::REQUEST_TIMEOUT.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::classifier::FixedSource;
    use crate::observability::trace::InMemoryExporter;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_lifecycle_closes_span_before_response() {
        let exporter = Arc::new(InMemoryExporter::new());
        let telemetry = Telemetry::new("demo", "backend", exporter.clone());
        let threshold = LiveThreshold::new(5);
        let (ctx, span) = telemetry
            .tracer()
            .start_span(&CorrelationContext::new_root(), "main-handler");

        let classified = Received::new(ctx, span)
            .delay(&FixedSource(Duration::from_millis(8)), &threshold)
            .await;
        assert_eq!(classified.outcome(), &Outcome::Timeout);
        assert_eq!(exporter.open_spans(), 1);

        let emitted = classified.emit(&telemetry);
        assert_eq!(exporter.open_spans(), 0);
        assert_eq!(telemetry.metrics().errors_total(), 1);

        let response = emitted.into_response();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
