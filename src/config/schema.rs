//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for both services.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration shared by the gateway and backend binaries.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Public-facing gateway settings.
    pub gateway: GatewayConfig,

    /// Internal backend settings.
    pub backend: BackendConfig,

    /// Logging, metrics and tracing settings.
    pub observability: ObservabilityConfig,
}

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Full URL of the backend endpoint called for every request.
    pub backend_url: String,

    /// Upper bound on one backend call, in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            backend_url: "http://127.0.0.1:8888/api/main".to_string(),
            request_timeout_ms: 5_000,
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Bind address (e.g., "0.0.0.0:8888").
    pub bind_address: String,

    /// Initial timeout threshold in milliseconds. Zero or negative disables it.
    pub max_response_ms: i64,

    /// Mean of the simulated latency distribution in milliseconds.
    pub mean_latency_ms: f64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8888".to_string(),
            max_response_ms: 5,
            mean_latency_ms: 1.0,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Value of the `app` label on every metric.
    pub app_name: String,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Trace collector endpoint. Spans are only logged when unset.
    pub trace_endpoint: Option<String>,

    /// Spans per collector request.
    pub export_batch_size: usize,

    /// Finished spans held while the collector is slow or down. Overflow is dropped.
    pub export_queue_size: usize,

    /// Upper bound on one collector request, in milliseconds.
    pub export_timeout_ms: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            app_name: "tracepipe".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            trace_endpoint: None,
            export_batch_size: 64,
            export_queue_size: 2048,
            export_timeout_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [backend]
            max_response_ms = 50

            [observability]
            log_format = "pretty"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.max_response_ms, 50);
        assert_eq!(config.backend.bind_address, "127.0.0.1:8888");
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert_eq!(config.gateway.request_timeout_ms, 5_000);
    }
}
