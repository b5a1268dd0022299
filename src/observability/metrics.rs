//! Metrics recording.
//!
//! # Metrics
//! - `retry_attempts_total` (counter): attempts started
//! - `retry_backoff_seconds` (histogram): backoff waited between attempts
//! - `retry_outcomes_total` (counter): terminal outcomes by `outcome`
//! - `retry_attempts_per_call` (histogram): attempts consumed per call
//! - `fallback_candidates_total` (counter): candidates run by `outcome`
//! - `image_fetch_bytes` (histogram): size of fetched images
//!
//! # Design Decisions
//! - Call sites only use the `metrics` facade
//! - The binary installs a Prometheus exporter when `observability.metrics_addr` is set
//! - Without a recorder every call is a no-op

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the global Prometheus recorder, serving `/metrics` on `addr`.
/// Must be called from within a Tokio runtime.
pub fn init_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_attempt() {
    metrics::counter!("retry_attempts_total").increment(1);
}

pub fn record_backoff(delay: Duration) {
    metrics::histogram!("retry_backoff_seconds").record(delay.as_secs_f64());
}

pub fn record_retry_outcome(outcome: &'static str, attempts: u32) {
    metrics::counter!("retry_outcomes_total", "outcome" => outcome).increment(1);
    metrics::histogram!("retry_attempts_per_call").record(f64::from(attempts));
}

pub fn record_fallback_candidate(outcome: &'static str) {
    metrics::counter!("fallback_candidates_total", "outcome" => outcome).increment(1);
}

pub fn record_image_bytes(bytes: usize) {
    metrics::histogram!("image_fetch_bytes").record(bytes as f64);
}
