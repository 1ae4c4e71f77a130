//! Correlation context carried through a request.
//!
//! # Responsibilities
//! - Identify the current trace and span
//! - Carry the session id and any upstream baggage
//! - Derive new contexts without mutating the old one
//!
//! # Design Decisions
//! - Ids are plain integers; hex formatting happens only on the wire and in logs
//! - Baggage is an ordered list, not a map, so header output is stable

use std::fmt;

use rand::Rng;
use serde::Serialize;

/// Baggage key under which the session id travels.
pub const SESSION_BAGGAGE_KEY: &str = "session_id";

/// 16-byte trace identifier. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(u128);

impl TraceId {
    /// Generate a random non-zero trace id.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let id: u128 = rng.gen();
            if id != 0 {
                return Self(id);
            }
        }
    }

    /// Wrap a raw value. Returns `None` for the invalid all-zero id.
    pub fn from_u128(value: u128) -> Option<Self> {
        (value != 0).then_some(Self(value))
    }

    pub fn to_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Serialize for TraceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 8-byte span identifier. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// Generate a random non-zero span id.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let id: u64 = rng.gen();
            if id != 0 {
                return Self(id);
            }
        }
    }

    /// Wrap a raw value. Returns `None` for the invalid all-zero id.
    pub fn from_u64(value: u64) -> Option<Self> {
        (value != 0).then_some(Self(value))
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for SpanId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Ordered key/value metadata propagated alongside the trace ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baggage {
    entries: Vec<(String, String)>,
}

impl Baggage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a copy with `key` set. An existing key keeps its position.
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.insert(key.into(), value.into());
        next
    }

    pub(crate) fn insert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Immutable per-request correlation value.
///
/// A context either points at a span (`span_id` is set) or is a fresh trace
/// that has not opened its first span yet. Spans started from a context become
/// children of `span_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    trace_id: TraceId,
    span_id: Option<SpanId>,
    sampled: bool,
    remote: bool,
    baggage: Baggage,
}

impl CorrelationContext {
    /// Start a brand new, sampled trace with no current span.
    pub fn new_root() -> Self {
        Self {
            trace_id: TraceId::random(),
            span_id: None,
            sampled: true,
            remote: false,
            baggage: Baggage::new(),
        }
    }

    /// Rebuild a context received from an upstream peer.
    pub fn remote(trace_id: TraceId, span_id: SpanId, sampled: bool, baggage: Baggage) -> Self {
        Self {
            trace_id,
            span_id: Some(span_id),
            sampled,
            remote: true,
            baggage,
        }
    }

    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    pub fn span_id(&self) -> Option<SpanId> {
        self.span_id
    }

    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// True when the current span lives in another process.
    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub fn baggage(&self) -> &Baggage {
        &self.baggage
    }

    /// Session id carried in baggage, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.baggage.get(SESSION_BAGGAGE_KEY)
    }

    pub fn with_baggage(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            baggage: self.baggage.with(key, value),
            ..self.clone()
        }
    }

    pub fn with_session(&self, session_id: &str) -> Self {
        self.with_baggage(SESSION_BAGGAGE_KEY, session_id)
    }

    /// Context whose current span is `span_id`, a local child of this one.
    pub(crate) fn enter(&self, span_id: SpanId) -> Self {
        Self {
            span_id: Some(span_id),
            remote: false,
            ..self.clone()
        }
    }
}
