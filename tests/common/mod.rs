//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tracepipe::backend::{BackendServer, BackendState, DurationSource, LiveThreshold};
use tracepipe::gateway::{BackendClient, GatewayServer, GatewayState};
use tracepipe::observability::trace::InMemoryExporter;
use tracepipe::observability::Telemetry;
use tracepipe::{Shutdown, BACKEND_SERVICE, GATEWAY_SERVICE};

/// A service running on an ephemeral port, stopped when dropped.
pub struct Running<S> {
    pub addr: SocketAddr,
    pub state: S,
    pub spans: Arc<InMemoryExporter>,
    shutdown: Shutdown,
}

impl<S> Running<S> {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl<S> Drop for Running<S> {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn backend_state(
    latency: Arc<dyn DurationSource>,
    threshold_ms: i64,
) -> (BackendState, Arc<InMemoryExporter>) {
    let spans = Arc::new(InMemoryExporter::new());
    let telemetry = Telemetry::new("tracepipe-test", BACKEND_SERVICE, spans.clone());
    let state = BackendState::new(telemetry, Arc::new(LiveThreshold::new(threshold_ms)), latency);
    (state, spans)
}

/// Start a backend with the given latency source and threshold.
pub async fn spawn_backend(
    latency: Arc<dyn DurationSource>,
    threshold_ms: i64,
) -> Running<BackendState> {
    let (state, spans) = backend_state(latency, threshold_ms);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = BackendServer::new(state.clone());
    let stopped = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, stopped).await;
    });

    Running {
        addr,
        state,
        spans,
        shutdown,
    }
}

/// Start a gateway pointed at `backend_url`.
pub async fn spawn_gateway(backend_url: &str, timeout: Duration) -> Running<GatewayState> {
    let spans = Arc::new(InMemoryExporter::new());
    let telemetry = Telemetry::new("tracepipe-test", GATEWAY_SERVICE, spans.clone());
    let client = BackendClient::new(backend_url, timeout).unwrap();
    let state = GatewayState::new(telemetry, client);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = GatewayServer::new(state.clone());
    let stopped = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, stopped).await;
    });

    Running {
        addr,
        state,
        spans,
        shutdown,
    }
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Start a programmable raw HTTP backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Drain the request head before answering.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            408 => "408 Request Timeout",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Value of the `session_id` cookie set by a response, if any.
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            let pair = v.split(';').next()?;
            let (name, value) = pair.split_once('=')?;
            (name.trim() == "session_id").then(|| value.trim().to_string())
        })
}
