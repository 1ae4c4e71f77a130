//! Process start and stop for the gateway and backend binaries.
//!
//! ```text
//! main: resolve config → init logging → startup::build_telemetry → bind
//!     → {Gateway,Backend}Server::run(listener, shutdown.subscribe())
//!
//! signals::shutdown_on_signal: Ctrl+C | SIGTERM → Shutdown::trigger
//!     → axum graceful shutdown drains in-flight requests
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
