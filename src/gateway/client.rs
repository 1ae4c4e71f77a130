//! Outbound client for the single configured backend.
//!
//! # Responsibilities
//! - Issue the correlated backend call with trace headers injected
//! - Normalize every reply or failure into an `Outcome`
//!
//! # Design Decisions
//! - Pooled hyper-util client, cloned cheaply into every request
//! - The whole exchange (connect, response, body) shares one deadline
//! - This is the only place transport errors exist; callers only see
//!   `BackendReply`

use std::error::Error as StdError;
use std::time::Duration;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{uri::InvalidUri, Method, Request, StatusCode, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::observability::trace::{propagation, CorrelationContext};
use crate::outcome::Outcome;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Why the backend exchange produced no usable reply.
#[derive(Debug, thiserror::Error)]
enum TransportFailure {
    #[error("invalid request: {0}")]
    Build(#[from] axum::http::Error),
    #[error("{}", error_chain(.0))]
    Request(#[from] hyper_util::client::legacy::Error),
    #[error("failed to read response body: {0}")]
    Body(axum::Error),
    #[error("no response within {0:?}")]
    TimedOut(Duration),
}

/// Render an error and its sources as one line.
fn error_chain(error: &dyn StdError) -> String {
    let mut line = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        line.push_str(": ");
        line.push_str(&cause.to_string());
        source = cause.source();
    }
    line
}

/// Classified result of one backend call.
#[derive(Debug, Clone)]
pub struct BackendReply {
    pub outcome: Outcome,
    /// Status code, when the backend answered at all.
    pub status: Option<StatusCode>,
    /// Response body, only kept on success.
    pub body: Option<Bytes>,
}

impl BackendReply {
    fn transport(failure: TransportFailure) -> Self {
        Self::transport_failed(failure.to_string())
    }

    /// A reply that never arrived.
    pub fn transport_failed(reason: String) -> Self {
        Self {
            outcome: Outcome::TransportError(reason),
            status: None,
            body: None,
        }
    }

    /// Map a backend status onto an outcome.
    ///
    /// 2xx is success, 408 is the backend's simulated timeout, anything else
    /// is an upstream error.
    pub fn from_status(status: StatusCode, body: Bytes) -> Self {
        let outcome = if status.is_success() {
            Outcome::Success
        } else if status == StatusCode::REQUEST_TIMEOUT {
            Outcome::Timeout
        } else {
            Outcome::UpstreamError(status.as_u16())
        };
        let body = outcome.is_success().then_some(body);
        Self {
            outcome,
            status: Some(status),
            body,
        }
    }
}

/// Client bound to one backend URL.
#[derive(Clone)]
pub struct BackendClient {
    client: Client<HttpConnector, Body>,
    uri: Uri,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(backend_url: &str, timeout: Duration) -> Result<Self, InvalidUri> {
        let uri: Uri = backend_url.parse()?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self {
            client,
            uri,
            timeout,
        })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Call the backend on behalf of `ctx`. Never fails; see `BackendReply`.
    pub async fn fetch(&self, ctx: &CorrelationContext) -> BackendReply {
        match tokio::time::timeout(self.timeout, self.exchange(ctx)).await {
            Ok(Ok((status, body))) => BackendReply::from_status(status, body),
            Ok(Err(failure)) => BackendReply::transport(failure),
            Err(_) => BackendReply::transport(TransportFailure::TimedOut(self.timeout)),
        }
    }

    async fn exchange(&self, ctx: &CorrelationContext) -> Result<(StatusCode, Bytes), TransportFailure> {
        let mut request = Request::builder()
            .method(Method::GET)
            .uri(self.uri.clone())
            .body(Body::empty())?;
        propagation::inject(ctx, request.headers_mut());

        let response = self.client.request(request).await?;
        let status = response.status();
        let body = to_bytes(Body::new(response.into_body()), MAX_BODY_BYTES)
            .await
            .map_err(TransportFailure::Body)?;
        Ok((status, body))
    }
}
