//! Spans and the tracer that opens them.
//!
//! # Lifecycle
//! ```text
//! Tracer::start_span(ctx, name)
//!     → exporter.on_start(&data)
//!     → set_attribute / add_event (any number)
//!     → end(status)             consumes the span
//!     → exporter.on_end(data)
//! ```
//!
//! A span dropped without `end` is closed by `Drop` with `SpanStatus::Unset`.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use super::context::{CorrelationContext, SpanId, TraceId};
use super::export::SpanExporter;

/// Final status of a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "message")]
pub enum SpanStatus {
    Unset,
    Ok,
    Error(String),
}

/// Attribute values a span accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u16> for AttributeValue {
    fn from(v: u16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Timestamped event recorded on a span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp_us: u64,
    pub attributes: Vec<(String, AttributeValue)>,
}

/// Everything recorded about a span. `end_us` is set once the span ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanData {
    pub service: String,
    pub name: String,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub parent_span_id: Option<SpanId>,
    pub start_us: u64,
    pub end_us: Option<u64>,
    pub duration_us: Option<u64>,
    pub attributes: Vec<(String, AttributeValue)>,
    pub events: Vec<SpanEvent>,
    pub status: SpanStatus,
}

impl SpanData {
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

fn unix_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}

/// An open span. Must be ended exactly once; see module docs.
pub struct Span {
    data: Option<SpanData>,
    started: Instant,
    exporter: Arc<dyn SpanExporter>,
}

impl Span {
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        if let Some(data) = self.data.as_mut() {
            let key = key.into();
            let value = value.into();
            match data.attributes.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => data.attributes.push((key, value)),
            }
        }
    }

    pub fn add_event(&mut self, name: impl Into<String>, attributes: Vec<(String, AttributeValue)>) {
        if let Some(data) = self.data.as_mut() {
            data.events.push(SpanEvent {
                name: name.into(),
                timestamp_us: unix_micros(),
                attributes,
            });
        }
    }

    /// End the span with `status` and hand it to the exporter.
    pub fn end(mut self, status: SpanStatus) {
        self.finish(status);
    }

    fn finish(&mut self, status: SpanStatus) {
        if let Some(mut data) = self.data.take() {
            data.end_us = Some(unix_micros());
            data.duration_us = Some(self.started.elapsed().as_micros() as u64);
            data.status = status;
            self.exporter.on_end(data);
        }
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if let Some(data) = self.data.as_ref() {
            tracing::warn!(
                span = %data.name,
                trace_id = %data.trace_id,
                span_id = %data.span_id,
                "Span dropped without being ended"
            );
            self.finish(SpanStatus::Unset);
        }
    }
}

/// Opens spans for one service and routes them to an exporter.
#[derive(Clone)]
pub struct Tracer {
    service: Arc<str>,
    exporter: Arc<dyn SpanExporter>,
}

impl Tracer {
    pub fn new(service: &str, exporter: Arc<dyn SpanExporter>) -> Self {
        Self {
            service: Arc::from(service),
            exporter,
        }
    }

    /// Open a child of the current span in `ctx`.
    ///
    /// Returns the derived context (whose current span is the new one) and the
    /// open span. When `ctx` has no current span the new span is a trace root.
    pub fn start_span(
        &self,
        ctx: &CorrelationContext,
        name: impl Into<String>,
    ) -> (CorrelationContext, Span) {
        let span_id = SpanId::random();
        let data = SpanData {
            service: self.service.to_string(),
            name: name.into(),
            trace_id: ctx.trace_id(),
            span_id,
            parent_span_id: ctx.span_id(),
            start_us: unix_micros(),
            end_us: None,
            duration_us: None,
            attributes: Vec::new(),
            events: Vec::new(),
            status: SpanStatus::Unset,
        };
        self.exporter.on_start(&data);

        let span = Span {
            data: Some(data),
            started: Instant::now(),
            exporter: self.exporter.clone(),
        };
        (ctx.enter(span_id), span)
    }

    /// Flush the exporter. Blocks; call from a blocking thread.
    pub fn shutdown(&self) {
        self.exporter.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::trace::export::InMemoryExporter;

    fn tracer() -> (Tracer, Arc<InMemoryExporter>) {
        let exporter = Arc::new(InMemoryExporter::new());
        (Tracer::new("test", exporter.clone()), exporter)
    }

    #[test]
    fn test_child_span_links_to_parent() {
        let (tracer, exporter) = tracer();
        let root = CorrelationContext::new_root();

        let (outer_ctx, outer) = tracer.start_span(&root, "outer");
        let (inner_ctx, inner) = tracer.start_span(&outer_ctx, "inner");
        assert_eq!(exporter.open_spans(), 2);

        inner.end(SpanStatus::Ok);
        outer.end(SpanStatus::Error("boom".into()));
        assert_eq!(exporter.open_spans(), 0);

        let finished = exporter.finished();
        assert_eq!(finished[0].name, "inner");
        assert_eq!(finished[0].parent_span_id, outer_ctx.span_id());
        assert_eq!(finished[0].span_id, inner_ctx.span_id().unwrap());
        assert_eq!(finished[1].parent_span_id, None);
        assert_eq!(finished[1].status, SpanStatus::Error("boom".into()));
        assert!(finished.iter().all(|s| s.trace_id == root.trace_id()));
    }

    #[test]
    fn test_attributes_and_events_are_recorded() {
        let (tracer, exporter) = tracer();
        let (_, mut span) = tracer.start_span(&CorrelationContext::new_root(), "work");
        span.set_attribute("peer.service", "backend");
        span.set_attribute("attempt", 1i64);
        span.set_attribute("attempt", 2i64);
        span.add_event("checkpoint", vec![("k".into(), "v".into())]);
        span.end(SpanStatus::Ok);

        let data = &exporter.finished()[0];
        assert_eq!(data.attribute("attempt"), Some(&AttributeValue::Int(2)));
        assert_eq!(data.attributes.len(), 2);
        assert_eq!(data.events[0].name, "checkpoint");
        assert!(data.end_us.unwrap() >= data.start_us);
    }

    #[test]
    fn test_dropped_span_is_closed_unset() {
        let (tracer, exporter) = tracer();
        {
            let (_, _span) = tracer.start_span(&CorrelationContext::new_root(), "leaky");
        }
        assert_eq!(exporter.open_spans(), 0);
        assert_eq!(exporter.finished()[0].status, SpanStatus::Unset);
    }
}
