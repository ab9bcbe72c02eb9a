//! Prometheus wiring for HTTP traffic and classifier queries.

use matcher::MatchMetrics;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;

pub const HTTP_REQUESTS_TOTAL: &str = "sharkid_http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "sharkid_http_request_duration_seconds";
pub const MATCH_QUERIES_TOTAL: &str = "sharkid_match_queries_total";
pub const MATCH_LATENCY: &str = "sharkid_match_latency_seconds";
pub const MATCH_CANDIDATES: &str = "sharkid_match_candidates";
pub const CATALOG_SIZE: &str = "sharkid_catalog_size";

/// Forwards classifier observations to the `metrics` facade.
#[derive(Debug, Default)]
pub struct PrometheusMatchMetrics;

impl MatchMetrics for PrometheusMatchMetrics {
    fn record_match(&self, latency: Duration, catalog_size: usize, candidates: usize) {
        metrics::counter!(MATCH_QUERIES_TOTAL).increment(1);
        metrics::histogram!(MATCH_LATENCY).record(latency.as_secs_f64());
        metrics::histogram!(MATCH_CANDIDATES).record(candidates as f64);
        metrics::gauge!(CATALOG_SIZE).set(catalog_size as f64);
    }
}

/// Install the process-wide Prometheus recorder and route classifier
/// observations into it.
pub fn install() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    matcher::set_match_metrics(Some(Arc::new(PrometheusMatchMetrics)));
    Ok(handle)
}

pub fn record_request(method: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION, "method" => method.to_string())
        .record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_observations_render_as_prometheus_text() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            PrometheusMatchMetrics.record_match(Duration::from_millis(3), 12, 2);
            record_request("POST", 200, Duration::from_millis(8));
        });
        let text = handle.render();
        assert!(text.contains(MATCH_QUERIES_TOTAL));
        assert!(text.contains(CATALOG_SIZE));
        assert!(text.contains("sharkid_http_requests_total{method=\"POST\",status=\"200\"} 1"));
    }
}
