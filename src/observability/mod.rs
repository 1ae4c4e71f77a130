//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request produces one Outcome:
//!     → metrics.rs (request counter, error counter if not success)
//!     → logging.rs (one structured record, level from the outcome)
//!     → trace/ (span status, then span end → exporter)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON)
//!     → Metrics endpoint (Prometheus scrape of /metrics)
//!     → Trace collector (optional)
//! ```
//!
//! # Design Decisions
//! - Session, trace and span ids flow through logs and spans alike
//! - Metrics are cheap (atomic increments)
//! - `Telemetry` is constructed per service and injected, never global

pub mod logging;
pub mod metrics;
pub mod telemetry;
pub mod trace;

pub use telemetry::Telemetry;
