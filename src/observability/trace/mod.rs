//! Distributed tracing support.
//!
//! # Data Flow
//! ```text
//! inbound headers
//!     → propagation::start_root_context (traceparent + baggage, or fresh)
//!     → Tracer::start_span (child of the current span)
//!     → propagation::inject (outbound headers)
//!     → Span::end → SpanExporter
//! ```
//!
//! # Design Decisions
//! - W3C Trace Context and W3C Baggage on the wire
//! - Context is an explicit value passed down the call chain, never ambient
//! - Exporters are pluggable so tests can inspect every span

pub mod context;
pub mod export;
pub mod otlp;
pub mod propagation;
pub mod span;

pub use context::{Baggage, CorrelationContext, SpanId, TraceId, SESSION_BAGGAGE_KEY};
pub use export::{FanoutExporter, InMemoryExporter, LogExporter, SpanExporter};
pub use otlp::{CollectorExporter, CollectorSettings};
pub use propagation::{extract, inject, start_root_context, TraceParent};
pub use span::{AttributeValue, Span, SpanData, SpanEvent, SpanStatus, Tracer};
