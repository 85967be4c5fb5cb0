//! Metrics collection and exposition.
//!
//! # Metrics
//! - `quote_race_requests_total` (counter): inbound requests by status
//! - `quote_race_request_duration_seconds` (histogram): inbound latency
//! - `quote_race_races_total` (counter): races by outcome
//! - `quote_race_race_duration_seconds` (histogram): launch to commit/failure
//! - `quote_race_source_losses_total` (counter): losses by source and cause
//! - `quote_race_persistence_total` (counter): persistence outcomes
//!
//! Without an installed recorder every call is a no-op, so library code and
//! tests record unconditionally.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, elapsed: Duration) {
    counter!("quote_race_requests_total", "status" => status.to_string()).increment(1);
    histogram!("quote_race_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_race(outcome: &'static str, elapsed: Duration) {
    counter!("quote_race_races_total", "outcome" => outcome).increment(1);
    histogram!("quote_race_race_duration_seconds", "outcome" => outcome).record(elapsed.as_secs_f64());
}

pub fn record_source_loss(source: &str, kind: &'static str) {
    counter!(
        "quote_race_source_losses_total",
        "source" => source.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_persistence(outcome: &'static str, elapsed: Duration) {
    counter!("quote_race_persistence_total", "outcome" => outcome).increment(1);
    histogram!("quote_race_persistence_duration_seconds").record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_request_metrics_are_rendered() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_request(504, Duration::from_millis(200));
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"quote_race_requests_total{status="504"} 1"#));
        assert!(rendered.contains("quote_race_request_duration_seconds"));
    }
}
