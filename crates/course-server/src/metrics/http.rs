//! Per-request HTTP metrics.

use std::time::Instant;

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};
use metrics::{counter, gauge, histogram};

use crate::handlers::courses::CACHE_DEGRADED_HEADER;

const REQUESTS_TOTAL: &str = "course_http_requests_total";
const REQUEST_SECONDS: &str = "course_http_request_duration_seconds";
const IN_FLIGHT: &str = "course_http_requests_in_flight";
const DEGRADED_TOTAL: &str = "course_http_degraded_responses_total";

/// Route label of a request. Unmatched requests share one label so that
/// arbitrary paths never become label values.
fn route_label(matched_path: Option<&MatchedPath>) -> String {
    matched_path.map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string())
}

pub async fn http_metrics_middleware(
    matched_path: Option<MatchedPath>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_owned();
    let route = route_label(matched_path.as_ref());

    gauge!(IN_FLIGHT).increment(1.0);
    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();
    gauge!(IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16().to_string();
    if response.headers().contains_key(&CACHE_DEGRADED_HEADER) {
        counter!(DEGRADED_TOTAL, "route" => route.clone()).increment(1);
    }

    counter!(
        REQUESTS_TOTAL,
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status
    )
    .increment(1);
    histogram!(REQUEST_SECONDS, "method" => method, "route" => route)
        .record(elapsed.as_secs_f64());

    response
}

pub fn register_http_metrics() {
    metrics::describe_counter!(REQUESTS_TOTAL, "Total number of HTTP requests");
    metrics::describe_histogram!(REQUEST_SECONDS, "HTTP request duration in seconds");
    metrics::describe_gauge!(IN_FLIGHT, "HTTP requests currently being served");
    metrics::describe_counter!(
        DEGRADED_TOTAL,
        "Responses served while the cache was failing"
    );
}
