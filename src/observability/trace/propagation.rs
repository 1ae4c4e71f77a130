//! W3C Trace Context and Baggage header codec.
//!
//! # Wire Format
//! ```text
//! traceparent: 00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01
//!              ^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^ ^^^^^^^^^^^^^^^^ ^^
//!         version           trace id                  span id      flags
//!
//! baggage: session_id=6f1c0e3e-...,tenant=a%20b
//! ```
//!
//! # Design Decisions
//! - Malformed headers are ignored, never an error: the request just starts
//!   a fresh trace
//! - Baggage values are percent-encoded with spaces as `%20`, never `+`

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use url::form_urlencoded;

use super::context::{Baggage, CorrelationContext, SpanId, TraceId};

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const BAGGAGE_HEADER: &str = "baggage";

const SUPPORTED_VERSION: u8 = 0;
const FLAG_SAMPLED: u8 = 0x01;
const MAX_BAGGAGE_BYTES: usize = 8192;
const MAX_BAGGAGE_MEMBERS: usize = 180;

/// Fields of a parsed `traceparent` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceParent {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub sampled: bool,
}

impl TraceParent {
    pub fn encode(&self) -> String {
        let flags = if self.sampled { FLAG_SAMPLED } else { 0 };
        format!(
            "{:02x}-{}-{}-{:02x}",
            SUPPORTED_VERSION, self.trace_id, self.span_id, flags
        )
    }

    pub fn parse(value: &str) -> Option<Self> {
        let mut fields = value.trim().split('-');
        let version = parse_hex_field(fields.next()?, 2)? as u8;
        if version == 0xff {
            return None;
        }

        let trace_id = TraceId::from_u128(parse_hex_field(fields.next()?, 32)?)?;
        let span_id = SpanId::from_u64(parse_hex_field(fields.next()?, 16)? as u64)?;
        let flags = parse_hex_field(fields.next()?, 2)? as u8;

        // Version 00 has exactly four fields; later versions may append more.
        if version == SUPPORTED_VERSION && fields.next().is_some() {
            return None;
        }

        Some(Self {
            trace_id,
            span_id,
            sampled: flags & FLAG_SAMPLED != 0,
        })
    }
}

fn parse_hex_field(field: &str, width: usize) -> Option<u128> {
    let valid = field.len() == width
        && field
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !valid {
        return None;
    }
    u128::from_str_radix(field, 16).ok()
}

/// Serialize baggage as a W3C `baggage` header value.
pub fn encode_baggage(baggage: &Baggage) -> String {
    baggage
        .iter()
        .filter(|(key, _)| {
            let valid = is_token(key);
            if !valid {
                tracing::warn!(key = %key, "Dropping baggage entry with invalid key");
            }
            valid
        })
        .map(|(key, value)| format!("{}={}", key, encode_component(value)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse a W3C `baggage` header value. Invalid members are skipped.
pub fn decode_baggage(value: &str) -> Baggage {
    let mut baggage = Baggage::new();
    if value.len() > MAX_BAGGAGE_BYTES {
        tracing::warn!(len = value.len(), "Ignoring oversized baggage header");
        return baggage;
    }

    for member in value.split(',') {
        if baggage.len() >= MAX_BAGGAGE_MEMBERS {
            break;
        }
        // Member properties after ';' are not used.
        let pair = member.split(';').next().unwrap_or_default();
        let Some((key, raw)) = pair.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if !is_token(key) {
            continue;
        }
        baggage.insert(key.to_string(), decode_component(raw.trim()));
    }
    baggage
}

fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn decode_component(raw: &str) -> String {
    // Form decoding gives '+', '&' and '=' meaning that baggage does not.
    let escaped = raw
        .replace('+', "%2B")
        .replace('&', "%26")
        .replace('=', "%3D");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default()
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

/// Rebuild the upstream context from inbound headers.
///
/// Returns `None` when there is no valid `traceparent`; baggage alone does not
/// make a context.
pub fn extract(headers: &HeaderMap) -> Option<CorrelationContext> {
    let parent = headers
        .get(TRACEPARENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(TraceParent::parse)?;

    // Multiple baggage headers are equivalent to one joined with ','.
    let joined = headers
        .get_all(BAGGAGE_HEADER)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(",");

    Some(CorrelationContext::remote(
        parent.trace_id,
        parent.span_id,
        parent.sampled,
        decode_baggage(&joined),
    ))
}

/// Write `ctx` onto outbound headers.
///
/// A context without a current span has nothing to parent to, so only the
/// baggage is written.
pub fn inject(ctx: &CorrelationContext, headers: &mut HeaderMap) {
    if let Some(span_id) = ctx.span_id() {
        let parent = TraceParent {
            trace_id: ctx.trace_id(),
            span_id,
            sampled: ctx.is_sampled(),
        };
        match HeaderValue::from_str(&parent.encode()) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(TRACEPARENT_HEADER), value);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode traceparent header"),
        }
    }

    if !ctx.baggage().is_empty() {
        match HeaderValue::from_str(&encode_baggage(ctx.baggage())) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(BAGGAGE_HEADER), value);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode baggage header"),
        }
    }
}

/// Root context for an inbound request.
///
/// Continues an upstream trace when the headers carry one, otherwise starts a
/// fresh trace. A `session_id` given here overrides one found in baggage.
pub fn start_root_context(headers: &HeaderMap, session_id: Option<&str>) -> CorrelationContext {
    let ctx = extract(headers).unwrap_or_else(CorrelationContext::new_root);
    match session_id {
        Some(session) => ctx.with_session(session),
        None => ctx,
    }
}
