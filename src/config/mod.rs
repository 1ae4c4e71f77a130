//! Service configuration.
//!
//! ```text
//! tracepipe.toml (optional, defaults otherwise)
//!     → loader::read_config (TOML into AppConfig)
//!     → loader::apply_env_overrides (GATEWAY_LISTEN, BACKEND_LISTEN, ...)
//!     → validation::validate_config (every problem reported at once)
//! ```
//!
//! Configuration is fixed after start-up. The backend threshold only seeds
//! `LiveThreshold`; later changes go through the errorGenerator endpoint.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve, ConfigError};
pub use schema::{AppConfig, BackendConfig, GatewayConfig, LogFormat, ObservabilityConfig};
