//! Structured request logging middleware.

use axum::{
    body::Body,
    http::{Request, Response},
};
use std::{
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::request_id::REQUEST_ID_HEADER;
use crate::handlers::courses::CACHE_DEGRADED_HEADER;

/// Layer that logs requests and responses.
#[derive(Clone, Default)]
pub struct LoggingLayer;

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingMiddleware { inner }
    }
}

/// Middleware that logs request/response details.
///
/// Completion is logged at `error` for 5xx responses and at `warn` for 4xx
/// responses or responses flagged with a degraded cache.
#[derive(Clone)]
pub struct LoggingMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for LoggingMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let start = Instant::now();

        // Set by RequestIdMiddleware, which runs first.
        let request_id = request
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let span = info_span!(
            "http_request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
        );

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(
            async move {
                debug!("Request started");

                let response = inner.call(request).await?;

                let status = response.status();
                let duration_ms = start.elapsed().as_millis() as u64;
                let code = status.as_u16();
                let cache_degraded = response.headers().contains_key(&CACHE_DEGRADED_HEADER);

                if status.is_server_error() {
                    error!(status = code, duration_ms, "Request failed");
                } else if status.is_client_error() {
                    warn!(status = code, duration_ms, "Request rejected");
                } else if cache_degraded {
                    warn!(status = code, duration_ms, "Request completed with degraded cache");
                } else {
                    info!(status = code, duration_ms, "Request completed");
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}
