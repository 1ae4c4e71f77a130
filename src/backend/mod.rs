//! Backend service.
//!
//! # Data Flow
//! ```text
//! GET /api/main (traceparent + baggage)
//!     → propagation (rebuild caller context, open child span)
//!     → request.rs (Received → Delaying → Classified → TelemetryEmitted)
//!     → 200 greeting | 408
//!
//! PUT /api/features/errorGenerator "50"
//!     → threshold.rs (parse, atomic swap)
//! ```

pub mod classifier;
pub mod handlers;
pub mod request;
pub mod server;
pub mod threshold;

pub use classifier::{classify, classify_duration, DurationSource, ExponentialSource, FixedSource};
pub use server::{build_router, BackendServer, BackendState};
pub use threshold::{parse_threshold, LiveThreshold, ThresholdError};
