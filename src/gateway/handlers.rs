//! Gateway HTTP handlers.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::gateway::client::BackendReply;
use crate::gateway::server::GatewayState;
use crate::observability::logging;
use crate::observability::metrics::EXPOSITION_CONTENT_TYPE;
use crate::observability::trace::{propagation, CorrelationContext};
use crate::outcome::Outcome;
use crate::session::{ensure_session, set_cookie_header};

pub const ROOT_PATH: &str = "/";
pub const METRICS_PATH: &str = "/metrics";

/// Body served whenever the backend did not succeed.
pub const FALLBACK_GREETING: &str = "Hello world from the gateway\n";

/// Public entry point: session, correlated backend call, composed response.
pub async fn root_handler(State(state): State<GatewayState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let (session, is_new) = ensure_session(&headers);

    let parent = propagation::start_root_context(&headers, Some(session.as_str()));
    let (ctx, mut span) = state.telemetry.tracer().start_span(&parent, "main-handler");
    span.set_attribute("http.route", ROOT_PATH);
    span.set_attribute("session.new", is_new);
    if is_new {
        logging::log_new_session(&ctx);
    }

    // Runs to completion even if the client disconnects first.
    let exchange = tokio::spawn(async move {
        let reply = call_backend(&state, &ctx).await;
        state
            .telemetry
            .conclude(&ctx, span, &reply.outcome, started.elapsed());
        reply
    });
    let reply = match exchange.await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, "Backend exchange task failed");
            BackendReply::transport_failed(e.to_string())
        }
    };

    let body = match reply.body {
        Some(bytes) if reply.outcome.is_success() => Body::from(bytes),
        _ => Body::from(FALLBACK_GREETING),
    };
    let mut response = Response::new(body);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    if is_new {
        match set_cookie_header(&session) {
            Some(cookie) => {
                response.headers_mut().insert(header::SET_COOKIE, cookie);
            }
            None => tracing::warn!(session_id = %session, "Session token not usable as cookie"),
        }
    }
    response
}

/// Backend call wrapped in its own client span.
async fn call_backend(state: &GatewayState, ctx: &CorrelationContext) -> BackendReply {
    let (call_ctx, mut span) = state.telemetry.tracer().start_span(ctx, "backend-call");
    span.set_attribute("peer.service", "backend");
    span.set_attribute("http.url", state.client.uri().to_string());

    let reply = state.client.fetch(&call_ctx).await;

    if let Some(status) = reply.status {
        span.set_attribute("http.status_code", status.as_u16());
    }
    if let Outcome::TransportError(error) = &reply.outcome {
        span.add_event(
            "backend connection error",
            vec![("error".to_string(), error.clone().into())],
        );
    }
    span.end(reply.outcome.span_status());
    reply
}

pub async fn metrics_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.telemetry.metrics().render(),
    )
}
