//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind_address(&mut errors, "gateway.bind_address", &config.gateway.bind_address);
    check_bind_address(&mut errors, "backend.bind_address", &config.backend.bind_address);

    match Url::parse(&config.gateway.backend_url) {
        Ok(url) if url.scheme() != "http" => errors.push(ValidationError::new(
            "gateway.backend_url",
            format!("unsupported scheme '{}', expected http", url.scheme()),
        )),
        Ok(url) if url.host_str().is_none() => {
            errors.push(ValidationError::new("gateway.backend_url", "missing host"))
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("gateway.backend_url", e.to_string())),
    }

    if config.gateway.request_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "gateway.request_timeout_ms",
            "must be greater than zero",
        ));
    }

    let mean = config.backend.mean_latency_ms;
    if !mean.is_finite() || mean <= 0.0 {
        errors.push(ValidationError::new(
            "backend.mean_latency_ms",
            format!("must be a positive number, got {}", mean),
        ));
    }

    if let Some(endpoint) = &config.observability.trace_endpoint {
        if let Err(e) = Url::parse(endpoint) {
            errors.push(ValidationError::new("observability.trace_endpoint", e.to_string()));
        }
    }

    let observability = &config.observability;
    for (field, value) in [
        ("observability.export_batch_size", observability.export_batch_size as u64),
        ("observability.export_queue_size", observability.export_queue_size as u64),
        ("observability.export_timeout_ms", observability.export_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bind_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if let Err(e) = value.parse::<SocketAddr>() {
        errors.push(ValidationError::new(field, format!("'{}': {}", value, e)));
    }
}
