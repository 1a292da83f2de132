//! Request metrics.
//!
//! # Metrics
//! - `pavilion_requests_total` (counter): requests by method, status
//! - `pavilion_request_duration_seconds` (histogram): latency by method

use std::time::Instant;

use metrics::{counter, histogram};

/// Record one completed request.
pub fn record_request(method: &str, status: u16, started: Instant) {
    counter!(
        "pavilion_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "pavilion_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}
