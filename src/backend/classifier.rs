//! Latency-based failure classification.
//!
//! # Responsibilities
//! - Draw a simulated processing time per request
//! - Decide success or timeout against the live threshold
//!
//! # Design Decisions
//! - Draws come from a `DurationSource` so tests can pin them
//! - Draws are whole milliseconds; sub-millisecond draws become zero
//! - The threshold is read after the delay, so an admin update made while a
//!   request sleeps applies to that request

use std::time::Duration;

use rand::Rng;

use crate::backend::threshold::LiveThreshold;
use crate::outcome::Outcome;

/// Source of simulated processing durations.
pub trait DurationSource: Send + Sync {
    fn draw(&self) -> Duration;
}

/// Exponentially distributed draws with a configurable mean.
#[derive(Debug, Clone)]
pub struct ExponentialSource {
    mean_ms: f64,
}

impl ExponentialSource {
    pub fn new(mean_ms: f64) -> Self {
        Self { mean_ms }
    }
}

impl Default for ExponentialSource {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl DurationSource for ExponentialSource {
    fn draw(&self) -> Duration {
        // Inverse CDF; `gen` yields [0, 1) so the log argument stays positive.
        let u: f64 = rand::thread_rng().gen();
        let sample = -(1.0 - u).ln() * self.mean_ms;
        Duration::from_millis(sample as u64)
    }
}

/// Always returns the same duration.
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub Duration);

impl DurationSource for FixedSource {
    fn draw(&self) -> Duration {
        self.0
    }
}

/// Pure classification rule.
///
/// `threshold` of `None` means disabled. Timeout iff `duration > threshold`.
pub fn classify_duration(duration: Duration, threshold: Option<Duration>) -> Outcome {
    match threshold {
        Some(limit) if duration > limit => Outcome::Timeout,
        _ => Outcome::Success,
    }
}

/// Draw, sleep for the draw, then classify against the current threshold.
pub async fn classify(
    source: &dyn DurationSource,
    threshold: &LiveThreshold,
) -> (Duration, Outcome) {
    let duration = source.draw();
    tokio::time::sleep(duration).await;
    (duration, classify_duration(duration, threshold.current()))
}
