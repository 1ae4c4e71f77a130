//! Correlated gateway/backend request pipeline.
//!
//! A public gateway issues a per-client session, calls a backend with W3C
//! trace context and baggage, and the backend injects latency-based failures.
//! Both sides report every request through counters, one log record and span
//! status derived from the same `Outcome`.

pub mod backend;
pub mod config;
pub mod gateway;
pub mod lifecycle;
pub mod observability;
pub mod outcome;
pub mod session;

pub use config::AppConfig;
pub use lifecycle::Shutdown;
pub use outcome::Outcome;

/// `svc` label and tracer name of the gateway.
pub const GATEWAY_SERVICE: &str = "gateway";

/// `svc` label and tracer name of the backend.
pub const BACKEND_SERVICE: &str = "backend";
