//! Live timeout threshold and its admin input parsing.
//!
//! # Design Decisions
//! - Stored as one `AtomicI64` of milliseconds: writes replace the whole
//!   word, readers never block and never see a torn value
//! - Zero or negative means the timeout classification is disabled

use std::num::IntErrorKind;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Largest accepted admin body, in bytes.
pub const MAX_INPUT_BYTES: usize = 64;

/// Process-wide threshold shared by every backend request.
#[derive(Debug)]
pub struct LiveThreshold {
    millis: AtomicI64,
}

impl LiveThreshold {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Current raw value in milliseconds.
    pub fn millis(&self) -> i64 {
        self.millis.load(Ordering::Acquire)
    }

    /// Current threshold, or `None` when disabled.
    pub fn current(&self) -> Option<Duration> {
        let millis = self.millis();
        (millis > 0).then(|| Duration::from_millis(millis as u64))
    }

    /// Replace the threshold, returning the previous value.
    pub fn set(&self, millis: i64) -> i64 {
        self.millis.swap(millis, Ordering::AcqRel)
    }
}

/// Why an admin threshold update was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThresholdError {
    #[error("empty value")]
    Empty,
    #[error("not a number: {0:?}")]
    NotANumber(String),
    #[error("negative value: {0}")]
    Negative(String),
    #[error("value out of range: {0}")]
    Overflow(String),
    #[error("request body larger than {MAX_INPUT_BYTES} bytes")]
    TooLarge,
    #[error("request body unreadable: {0}")]
    Unreadable(String),
}

/// Parse an admin body into a non-negative millisecond count.
pub fn parse_threshold(input: &str) -> Result<i64, ThresholdError> {
    let value = input.trim();
    if value.is_empty() {
        return Err(ThresholdError::Empty);
    }
    if value.starts_with('-') {
        // "-0" is still a sign the caller meant a negative number.
        return match value.parse::<i64>() {
            Ok(_) => Err(ThresholdError::Negative(value.to_string())),
            Err(e) if *e.kind() == IntErrorKind::NegOverflow => {
                Err(ThresholdError::Negative(value.to_string()))
            }
            Err(_) => Err(ThresholdError::NotANumber(value.to_string())),
        };
    }

    value.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => ThresholdError::Overflow(value.to_string()),
        _ => ThresholdError::NotANumber(value.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_non_negative_integers() {
        assert_eq!(parse_threshold("50"), Ok(50));
        assert_eq!(parse_threshold(" 0\n"), Ok(0));
        assert_eq!(parse_threshold("+7"), Ok(7));
    }

    #[test]
    fn test_parse_rejections() {
        assert_eq!(parse_threshold(""), Err(ThresholdError::Empty));
        assert_eq!(parse_threshold("  "), Err(ThresholdError::Empty));
        assert_eq!(parse_threshold("-5"), Err(ThresholdError::Negative("-5".into())));
        assert_eq!(parse_threshold("-0"), Err(ThresholdError::Negative("-0".into())));
        assert_eq!(parse_threshold("abc"), Err(ThresholdError::NotANumber("abc".into())));
        assert_eq!(parse_threshold("-abc"), Err(ThresholdError::NotANumber("-abc".into())));
        assert_eq!(parse_threshold("1.5"), Err(ThresholdError::NotANumber("1.5".into())));
        assert!(matches!(
            parse_threshold("99999999999999999999"),
            Err(ThresholdError::Overflow(_))
        ));
        assert!(matches!(
            parse_threshold("-99999999999999999999"),
            Err(ThresholdError::Negative(_))
        ));
    }

    #[test]
    fn test_live_threshold() {
        let threshold = LiveThreshold::new(5);
        assert_eq!(threshold.current(), Some(Duration::from_millis(5)));

        assert_eq!(threshold.set(0), 5);
        assert_eq!(threshold.current(), None);

        threshold.set(-3);
        assert_eq!(threshold.current(), None);
        assert_eq!(threshold.millis(), -3);
    }
}
