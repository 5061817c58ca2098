//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (requests, latency, upstream errors)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, outcome
//! - `proxy_request_duration_seconds` (histogram): latency by outcome
//! - `proxy_upstream_errors_total` (counter): transport failures by kind
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Outcome is one of `intercepted`, `forwarded`, `failed`, `unmatched`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::error::TransportErrorKind;

/// Record one finished request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();

    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!("proxy_request_duration_seconds", "outcome" => outcome).record(elapsed);
}

/// Record a request that never produced an upstream response.
pub fn record_upstream_error(kind: TransportErrorKind) {
    counter!("proxy_upstream_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_harmless() {
        record_request("GET", 200, "forwarded", Instant::now());
        record_upstream_error(TransportErrorKind::Timeout);
    }

    #[test]
    fn recorder_renders_request_counter() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_request("GET", 502, "failed", Instant::now());
        });

        let rendered = handle.render();
        assert!(rendered.contains("proxy_requests_total"));
        assert!(rendered.contains("outcome=\"failed\""));
        assert!(rendered.contains("status=\"502\""));
    }
}
