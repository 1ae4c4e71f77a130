//! Per-request outcome and the observations derived from it.
//!
//! One `Outcome` is produced per request. Counter increments, log severity and
//! span status are all functions of it, so they cannot disagree.

use std::fmt;

use crate::observability::trace::SpanStatus;

/// Message logged and recorded for a classifier timeout.
pub const TIMEOUT_REASON: &str = "response is taking too long";

/// Result of handling one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Backend processing exceeded the live threshold.
    Timeout,
    /// The backend could not be reached or its reply could not be read.
    TransportError(String),
    /// The backend answered with an unexpected status code.
    UpstreamError(u16),
}

/// Log level an outcome is reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn severity(&self) -> Severity {
        match self {
            Outcome::Success => Severity::Info,
            Outcome::Timeout | Outcome::TransportError(_) => Severity::Error,
            Outcome::UpstreamError(_) => Severity::Warn,
        }
    }

    /// Human-readable reason, `None` for success.
    pub fn reason(&self) -> Option<String> {
        match self {
            Outcome::Success => None,
            Outcome::Timeout => Some(TIMEOUT_REASON.to_string()),
            Outcome::TransportError(e) => Some(format!("cannot reach backend: {}", e)),
            Outcome::UpstreamError(code) => Some(format!("backend returned status {}", code)),
        }
    }

    pub fn span_status(&self) -> SpanStatus {
        match self.reason() {
            None => SpanStatus::Ok,
            Some(reason) => SpanStatus::Error(reason),
        }
    }

    /// Short tag used as a log field.
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Timeout => "timeout",
            Outcome::TransportError(_) => "transport_error",
            Outcome::UpstreamError(_) => "upstream_error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::UpstreamError(code) => write!(f, "{}({})", self.tag(), code),
            _ => f.write_str(self.tag()),
        }
    }
}
