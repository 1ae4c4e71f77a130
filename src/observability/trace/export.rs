//! Span exporters (the trace sink).
//!
//! # Exporters
//! - `LogExporter`: finished spans as structured log events
//! - `CollectorExporter` (in `otlp`): OTLP/gRPC export to a collector
//! - `InMemoryExporter`: keeps everything, for tests and local inspection
//! - `FanoutExporter`: forwards to several exporters
//!
//! # Design Decisions
//! - `on_end` never blocks request handling; exporters doing I/O only
//!   enqueue and a background task does the rest
//! - Export failures are logged and dropped, never surfaced to requests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::span::{SpanData, SpanStatus};

/// Receives span lifecycle notifications.
pub trait SpanExporter: Send + Sync {
    /// Called when a span opens. Most exporters only care about `on_end`.
    fn on_start(&self, _span: &SpanData) {}

    /// Called exactly once per span, when it ends.
    fn on_end(&self, span: SpanData);

    /// Flush anything buffered. Called once, off the async runtime, at exit.
    fn shutdown(&self) {}
}

/// Writes each finished span as a `tracing` event.
#[derive(Debug, Default)]
pub struct LogExporter;

impl SpanExporter for LogExporter {
    fn on_end(&self, span: SpanData) {
        let status = match &span.status {
            SpanStatus::Unset => "unset",
            SpanStatus::Ok => "ok",
            SpanStatus::Error(_) => "error",
        };
        let attributes = serde_json::to_string(&span.attributes).unwrap_or_default();
        tracing::info!(
            target: "tracepipe::spans",
            service = %span.service,
            span = %span.name,
            trace_id = %span.trace_id,
            span_id = %span.span_id,
            parent_span_id = ?span.parent_span_id.map(|id| id.to_string()),
            duration_us = span.duration_us.unwrap_or_default(),
            status,
            attributes = %attributes,
            events = span.events.len(),
            "Span finished"
        );
    }
}

/// Records spans in memory and tracks how many are still open.
#[derive(Debug, Default)]
pub struct InMemoryExporter {
    started: AtomicUsize,
    ended: AtomicUsize,
    finished: Mutex<Vec<SpanData>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spans started but not yet ended.
    pub fn open_spans(&self) -> usize {
        self.started
            .load(Ordering::SeqCst)
            .saturating_sub(self.ended.load(Ordering::SeqCst))
    }

    pub fn started_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Snapshot of finished spans, in end order.
    pub fn finished(&self) -> Vec<SpanData> {
        match self.finished.lock() {
            Ok(spans) => spans.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SpanExporter for InMemoryExporter {
    fn on_start(&self, _span: &SpanData) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_end(&self, span: SpanData) {
        if let Ok(mut spans) = self.finished.lock() {
            spans.push(span);
        }
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}

/// Forwards every notification to each inner exporter in order.
pub struct FanoutExporter {
    exporters: Vec<Arc<dyn SpanExporter>>,
}

impl FanoutExporter {
    pub fn new(exporters: Vec<Arc<dyn SpanExporter>>) -> Self {
        Self { exporters }
    }
}

impl SpanExporter for FanoutExporter {
    fn on_start(&self, span: &SpanData) {
        for exporter in &self.exporters {
            exporter.on_start(span);
        }
    }

    fn on_end(&self, span: SpanData) {
        if let Some((last, rest)) = self.exporters.split_last() {
            for exporter in rest {
                exporter.on_end(span.clone());
            }
            last.on_end(span);
        }
    }

    fn shutdown(&self) {
        for exporter in &self.exporters {
            exporter.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::trace::context::CorrelationContext;
    use crate::observability::logging::capture;
    use crate::observability::trace::span::Tracer;

    #[test]
    fn test_fanout_reaches_every_exporter() {
        let a = Arc::new(InMemoryExporter::new());
        let b = Arc::new(InMemoryExporter::new());
        let fanout = Arc::new(FanoutExporter::new(vec![a.clone(), b.clone()]));
        let tracer = Tracer::new("test", fanout);

        let (_, span) = tracer.start_span(&CorrelationContext::new_root(), "op");
        assert_eq!(a.open_spans(), 1);
        assert_eq!(b.open_spans(), 1);
        span.end(SpanStatus::Ok);

        assert_eq!(a.finished().len(), 1);
        assert_eq!(b.finished().len(), 1);
        assert_eq!(a.open_spans() + b.open_spans(), 0);
    }

    #[test]
    fn test_span_data_serializes_hex_ids() {
        let exporter = Arc::new(InMemoryExporter::new());
        let tracer = Tracer::new("svc", exporter.clone());
        let (ctx, span) = tracer.start_span(&CorrelationContext::new_root(), "op");
        span.end(SpanStatus::Error("late".into()));

        let json = serde_json::to_value(&exporter.finished()[0]).unwrap();
        assert_eq!(json["trace_id"], ctx.trace_id().to_string());
        assert_eq!(json["status"]["code"], "Error");
        assert_eq!(json["status"]["message"], "late");
        assert!(json["parent_span_id"].is_null());
    }

    #[test]
    fn test_log_exporter_writes_at_info() {
        let (subscriber, captured) = capture::subscriber();
        let tracer = Tracer::new("backend", Arc::new(LogExporter));

        tracing::subscriber::with_default(subscriber, || {
            let (ctx, mut span) = tracer.start_span(&CorrelationContext::new_root(), "main-handler");
            span.set_attribute("outcome", "success");
            span.end(SpanStatus::Ok);

            let records = captured.with_message("Span finished");
            assert_eq!(records.len(), 1);
            let record = &records[0];
            assert_eq!(record.level, tracing::Level::INFO);
            assert_eq!(record.target, "tracepipe::spans");
            assert_eq!(record.field("trace_id"), Some(ctx.trace_id().to_string().as_str()));
            assert_eq!(record.field("status"), Some("ok"));
            assert!(record.field("attributes").unwrap().contains("success"));
        });
    }
}
