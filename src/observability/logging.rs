//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem (JSON or pretty output)
//! - Emit the per-request outcome record and the new-session event
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - Every request record carries session, trace and span ids so logs join
//!   against traces

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::observability::trace::CorrelationContext;
use crate::outcome::{Outcome, Severity};

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("tracepipe={},tower_http=info", config.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}

fn field(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Write the single outcome record for a request.
///
/// The level follows `Outcome::severity`.
pub fn log_outcome(ctx: &CorrelationContext, outcome: &Outcome, duration: Duration) {
    let session_id = ctx.session_id().unwrap_or("-");
    let trace_id = ctx.trace_id().to_string();
    let span_id = field(ctx.span_id());
    let duration_ms = duration.as_secs_f64() * 1000.0;
    let tag = outcome.tag();

    match (outcome.severity(), outcome.reason()) {
        (Severity::Info, _) => tracing::info!(
            session_id,
            trace_id = %trace_id,
            span_id = %span_id,
            duration_ms,
            outcome = tag,
            "Request completed"
        ),
        (Severity::Warn, reason) => tracing::warn!(
            session_id,
            trace_id = %trace_id,
            span_id = %span_id,
            duration_ms,
            outcome = tag,
            reason = %field(reason),
            "Request degraded"
        ),
        (Severity::Error, reason) => tracing::error!(
            session_id,
            trace_id = %trace_id,
            span_id = %span_id,
            duration_ms,
            outcome = tag,
            reason = %field(reason),
            "Request failed"
        ),
    }
}

/// Informational event for a freshly issued session.
pub fn log_new_session(ctx: &CorrelationContext) {
    tracing::info!(
        session_id = ctx.session_id().unwrap_or("-"),
        trace_id = %ctx.trace_id(),
        "New session created"
    );
}
