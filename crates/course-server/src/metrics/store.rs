//! Store metrics recording.

use std::time::Duration;

use metrics::{counter, histogram};

pub fn register_store_metrics() {
    metrics::describe_histogram!(
        "course_store_operation_seconds",
        "Time spent on document store operations"
    );
    metrics::describe_counter!(
        "course_store_errors_total",
        "Document store calls that failed, including not found"
    );
}

/// Records one store call. `error` is `None` on success, otherwise a short
/// label such as `not_found` or `timeout`.
pub fn record_store_operation(
    operation: &'static str,
    duration: Duration,
    error: Option<&'static str>,
) {
    histogram!("course_store_operation_seconds", "operation" => operation)
        .record(duration.as_secs_f64());

    if let Some(reason) = error {
        counter!(
            "course_store_errors_total",
            "operation" => operation,
            "reason" => reason
        )
        .increment(1);
    }
}
