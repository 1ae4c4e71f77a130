//! Backend HTTP handlers.

use std::error::Error as StdError;
use std::net::SocketAddr;

use axum::{
    body::to_bytes,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;

use crate::backend::request::Received;
use crate::backend::server::BackendState;
use crate::backend::threshold::{parse_threshold, ThresholdError, MAX_INPUT_BYTES};
use crate::observability::metrics::EXPOSITION_CONTENT_TYPE;
use crate::observability::trace::propagation;

pub const MAIN_PATH: &str = "/api/main";
pub const ERROR_GENERATOR_PATH: &str = "/api/features/errorGenerator";
pub const METRICS_PATH: &str = "/metrics";

/// Endpoint called by the gateway.
pub async fn main_handler(State(state): State<BackendState>, headers: HeaderMap) -> Response {
    let parent = propagation::start_root_context(&headers, None);
    let (ctx, mut span) = state.telemetry.tracer().start_span(&parent, "main-handler");
    span.set_attribute("http.route", MAIN_PATH);

    let session_id = ctx.session_id().unwrap_or_default().to_string();
    span.add_event(
        "handling session_id",
        vec![("session_id".to_string(), session_id.into())],
    );

    // Runs to completion even if the caller hangs up mid-delay.
    let lifecycle = tokio::spawn(async move {
        Received::new(ctx, span)
            .delay(state.latency.as_ref(), &state.threshold)
            .await
            .emit(&state.telemetry)
    });

    match lifecycle.await {
        Ok(emitted) => emitted.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Request lifecycle task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Current threshold in milliseconds, as plain text.
pub async fn get_error_generator(State(state): State<BackendState>) -> String {
    state.threshold.millis().to_string()
}

/// Replace the live threshold with the integer in the request body.
pub async fn put_error_generator(State(state): State<BackendState>, request: Request) -> Response {
    let origin = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let parsed = match to_bytes(request.into_body(), MAX_INPUT_BYTES).await {
        Ok(bytes) => match std::str::from_utf8(&bytes) {
            Ok(text) => parse_threshold(text).map_err(|e| (e, text.to_string())),
            Err(e) => Err((
                ThresholdError::Unreadable(e.to_string()),
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
        },
        Err(e) if exceeds_limit(&e) => Err((ThresholdError::TooLarge, String::new())),
        Err(e) => Err((ThresholdError::Unreadable(e.to_string()), String::new())),
    };

    match parsed {
        Ok(value) => {
            let previous = state.threshold.set(value);
            tracing::warn!(
                value,
                previous,
                origin = %origin,
                "errorGenerator threshold updated"
            );
            state.threshold.millis().to_string().into_response()
        }
        Err((error, input)) => {
            tracing::error!(
                input = %input,
                origin = %origin,
                error = %error,
                current = state.threshold.millis(),
                "Rejected errorGenerator update"
            );
            (StatusCode::BAD_REQUEST, format!("{}\n", error)).into_response()
        }
    }
}

fn exceeds_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(cause) = source {
        if cause.is::<LengthLimitError>() {
            return true;
        }
        source = cause.source();
    }
    false
}

pub async fn metrics_handler(State(state): State<BackendState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.telemetry.metrics().render(),
    )
}
