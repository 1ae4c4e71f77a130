//! OTLP export of finished spans.
//!
//! # Data Flow
//! ```text
//! Span::end → CollectorExporter::on_end (try_send, bounded)
//!     → replay task (SpanData → SDK span with the same ids and times)
//!     → BatchSpanProcessor → OTLP/gRPC collector
//! ```
//!
//! # Design Decisions
//! - `on_end` never waits: a full queue drops the span and counts it
//! - Every collector call is bounded by the export timeout, so a hung
//!   collector costs at most one queue of memory
//! - Ids are ours, the SDK only transports them

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use opentelemetry::trace::{
    Event, SpanBuilder, SpanContext, SpanKind, Status, TraceContextExt, TraceError, TraceFlags,
    TraceState, TracerProvider as _,
};
use opentelemetry::trace::Span as _;
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{BatchConfigBuilder, BatchSpanProcessor, Tracer as SdkTracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use tokio::sync::mpsc;

use super::export::SpanExporter;
use super::span::{AttributeValue, SpanData, SpanStatus};

/// Where and how spans leave the process.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// OTLP/gRPC endpoint, e.g. `http://localhost:4317`.
    pub endpoint: String,
    pub batch_size: usize,
    /// Spans held in memory while the collector is slow or down.
    pub queue_size: usize,
    /// Upper bound on one export call.
    pub timeout: Duration,
}

/// Ships finished spans to an OpenTelemetry collector.
pub struct CollectorExporter {
    tx: mpsc::Sender<SpanData>,
    dropped: AtomicU64,
    replayed: Arc<AtomicU64>,
    provider: TracerProvider,
}

impl CollectorExporter {
    const SCHEDULED_DELAY: Duration = Duration::from_secs(2);

    /// Build the OTLP pipeline and spawn the replay task.
    ///
    /// Must be called inside a multi-threaded Tokio runtime.
    pub fn spawn(service: &str, settings: &CollectorSettings) -> Result<Self, TraceError> {
        let queue_size = settings.queue_size.max(1);

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(settings.endpoint.clone())
            .with_timeout(settings.timeout)
            .build()?;

        let batch = BatchConfigBuilder::default()
            .with_max_queue_size(queue_size)
            .with_max_export_batch_size(settings.batch_size.clamp(1, queue_size))
            .with_scheduled_delay(Self::SCHEDULED_DELAY)
            .with_max_export_timeout(settings.timeout)
            .build();
        let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
            .with_batch_config(batch)
            .build();

        let provider = TracerProvider::builder()
            .with_span_processor(processor)
            .with_resource(Resource::new(vec![KeyValue::new(
                "service.name",
                service.to_string(),
            )]))
            .build();

        let (tx, rx) = mpsc::channel(queue_size);
        let replayed = Arc::new(AtomicU64::new(0));
        tokio::spawn(replay(provider.tracer("tracepipe"), rx, replayed.clone()));

        tracing::info!(
            endpoint = %settings.endpoint,
            batch_size = settings.batch_size,
            queue_size,
            timeout_ms = settings.timeout.as_millis() as u64,
            "Span collector export started"
        );

        Ok(Self {
            tx,
            dropped: AtomicU64::new(0),
            replayed,
            provider,
        })
    }

    /// Spans discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Spans handed to the OTLP batch processor.
    pub fn replayed(&self) -> u64 {
        self.replayed.load(Ordering::Relaxed)
    }
}

impl SpanExporter for CollectorExporter {
    fn on_end(&self, span: SpanData) {
        match self.tx.try_send(span) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(span)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    tracing::warn!(dropped, span = %span.name, "Span export queue full, dropping spans");
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Collector replay task gone, dropping span");
            }
        }
    }

    /// Flush what the batch processor holds. Blocks up to the export timeout.
    fn shutdown(&self) {
        match self.provider.shutdown() {
            Ok(()) => tracing::info!(
                dropped = self.dropped(),
                exported = self.replayed(),
                "Span collector export stopped"
            ),
            Err(e) => tracing::warn!(error = %e, "Span collector shutdown failed"),
        }
    }
}

async fn replay(tracer: SdkTracer, mut rx: mpsc::Receiver<SpanData>, replayed: Arc<AtomicU64>) {
    while let Some(span) = rx.recv().await {
        let parent = parent_context(&span);
        let end = span.end_us.map(system_time).unwrap_or_else(SystemTime::now);
        let mut sdk_span = span_builder(span).start_with_context(&tracer, &parent);
        sdk_span.end_with_timestamp(end);
        replayed.fetch_add(1, Ordering::Relaxed);
    }
}

fn system_time(unix_us: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_micros(unix_us)
}

fn otel_trace_id(span: &SpanData) -> opentelemetry::trace::TraceId {
    opentelemetry::trace::TraceId::from_bytes(span.trace_id.to_u128().to_be_bytes())
}

fn otel_span_id(id: super::context::SpanId) -> opentelemetry::trace::SpanId {
    opentelemetry::trace::SpanId::from_bytes(id.to_u64().to_be_bytes())
}

/// The remote parent a replayed span hangs off, or an empty context for a root.
fn parent_context(span: &SpanData) -> Context {
    match span.parent_span_id {
        Some(parent) => Context::new().with_remote_span_context(SpanContext::new(
            otel_trace_id(span),
            otel_span_id(parent),
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        )),
        None => Context::new(),
    }
}

fn key_value(key: String, value: AttributeValue) -> KeyValue {
    match value {
        AttributeValue::Str(v) => KeyValue::new(key, v),
        AttributeValue::Int(v) => KeyValue::new(key, v),
        AttributeValue::Float(v) => KeyValue::new(key, v),
        AttributeValue::Bool(v) => KeyValue::new(key, v),
    }
}

fn span_builder(span: SpanData) -> SpanBuilder {
    let trace_id = otel_trace_id(&span);
    // Spans calling another service carry its name.
    let kind = if span.attribute("peer.service").is_some() {
        SpanKind::Client
    } else {
        SpanKind::Server
    };
    let status = match span.status {
        SpanStatus::Unset => Status::Unset,
        SpanStatus::Ok => Status::Ok,
        SpanStatus::Error(message) => Status::error(message),
    };
    let events = span
        .events
        .into_iter()
        .map(|event| {
            let attributes = event
                .attributes
                .into_iter()
                .map(|(k, v)| key_value(k, v))
                .collect();
            Event::new(event.name, system_time(event.timestamp_us), attributes, 0)
        })
        .collect();

    let mut builder = SpanBuilder::from_name(span.name);
    builder.trace_id = Some(trace_id);
    builder.span_id = Some(otel_span_id(span.span_id));
    builder.span_kind = Some(kind);
    builder.start_time = Some(system_time(span.start_us));
    builder.attributes = Some(
        span.attributes
            .into_iter()
            .map(|(k, v)| key_value(k, v))
            .collect(),
    );
    builder.events = Some(events);
    builder.status = status;
    builder
}
