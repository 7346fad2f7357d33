//! Request-layer metrics
//!
//! Emitted through the `metrics` facade. Without an installed recorder every
//! call is a no-op, so embedding applications opt in by installing one.
//!
//! - `api_client_requests_total` (counter): labels `method`, `status`
//! - `api_client_request_duration_seconds` (histogram): label `method`
//! - `api_client_network_errors_total` (counter): label `error_type`
//! - `api_client_refresh_total` (counter): label `outcome`

use crate::transport::TransportError;

/// Record one network attempt that produced a response.
pub fn record_request(method: &str, status: u16, duration_secs: f64) {
    ::metrics::counter!(
        "api_client_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("api_client_request_duration_seconds", "method" => method.to_string())
        .record(duration_secs);
}

/// Record an attempt that failed before any response arrived.
pub fn record_network_error(error: &TransportError) {
    let error_type = match error {
        TransportError::Timeout(_) => "timeout",
        TransportError::Connect(_) => "connection",
        TransportError::Other(_) => "other",
    };
    ::metrics::counter!("api_client_network_errors_total", "error_type" => error_type)
        .increment(1);
}

/// Record a settled session refresh: `success`, `rejected` or `network`.
pub fn record_refresh(outcome: &'static str) {
    ::metrics::counter!("api_client_refresh_total", "outcome" => outcome).increment(1);
}
