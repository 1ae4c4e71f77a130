//! Gateway service.
//!
//! # Data Flow
//! ```text
//! GET / (Cookie: session_id?)
//!     → session (reuse or issue token)
//!     → propagation (root context + session baggage, server span)
//!     → client.rs (client span, traceparent + baggage, GET backend)
//!     → Outcome (Success | Timeout | UpstreamError | TransportError)
//!     → telemetry, then backend body or fallback greeting
//! ```
//!
//! # Failure Policy
//! Every non-success outcome is a soft failure: the client gets 200 with the
//! fallback greeting and an error is counted.

pub mod client;
pub mod handlers;
pub mod server;

pub use client::{BackendClient, BackendReply};
pub use handlers::FALLBACK_GREETING;
pub use server::{build_router, GatewayServer, GatewayState};
