//! Concurrent load against the backend and the threshold.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use tracepipe::backend::{build_router, FixedSource};

fn main_request() -> Request<Body> {
    Request::builder().uri("/api/main").body(Body::empty()).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_with_disabled_threshold() {
    let (state, spans) = common::backend_state(Arc::new(FixedSource(Duration::from_millis(1))), 0);
    let router = build_router(state.clone());

    let requests_before = state.telemetry.metrics().requests_total();
    let errors_before = state.telemetry.metrics().errors_total();

    let mut handles = Vec::new();
    for _ in 0..1000 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            router.oneshot(main_request()).await.unwrap().status()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let metrics = state.telemetry.metrics();
    assert_eq!(metrics.requests_total() - requests_before, 1000);
    assert_eq!(metrics.errors_total() - errors_before, 0);
    assert_eq!(spans.open_spans(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_request_counted_once_under_mixed_outcomes() {
    let (state, spans) = common::backend_state(Arc::new(FixedSource(Duration::from_millis(5))), 0);
    let router = build_router(state.clone());

    let mut handles = Vec::new();
    for i in 0..400 {
        let router = router.clone();
        let threshold = state.threshold.clone();
        handles.push(tokio::spawn(async move {
            // Flip the threshold while requests are in flight.
            if i % 50 == 0 {
                threshold.set(if (i / 50) % 2 == 0 { 1 } else { 0 });
            }
            router.oneshot(main_request()).await.unwrap().status()
        }));
    }

    let mut timeouts = 0u64;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => {}
            StatusCode::REQUEST_TIMEOUT => timeouts += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    let metrics = state.telemetry.metrics();
    assert_eq!(metrics.requests_total(), 400);
    assert_eq!(metrics.errors_total(), timeouts);
    assert_eq!(spans.finished().len(), 400);
    assert_eq!(spans.open_spans(), 0);
}
