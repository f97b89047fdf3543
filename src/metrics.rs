//! Request metrics.
//!
//! [`RequestMetrics`] holds the two counters the admin page shows. Per-route
//! request, response and latency series go through the `metrics` facade and
//! are exported by Prometheus when [`install_prometheus_exporter`] has run;
//! without a recorder they cost nothing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

/// Routes served by this process. Any other path is labelled [`OTHER_PATH`].
const KNOWN_PATHS: [&str; 9] = [
    "/api/healthz",
    "/api/login",
    "/api/refresh",
    "/api/revoke",
    "/api/logout",
    "/api/users",
    "/api/users/me",
    "/admin/metrics",
    "/admin/reset",
];

const OTHER_PATH: &str = "other";

/// Histogram buckets for `http_request_duration_seconds`.
const DURATION_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Counters shared by the request logger and the admin endpoints.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    requests: AtomicU64,
    unauthorized: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub unauthorized: u64,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unauthorized(&self) {
        self.unauthorized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            unauthorized: self.unauthorized.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.unauthorized.store(0, Ordering::Relaxed);
    }
}

/// Install the Prometheus recorder and serve it on `0.0.0.0:port`.
/// Must be called from within the tokio runtime.
pub fn install_prometheus_exporter(port: u16) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &DURATION_BUCKETS,
        )?
        .install()
}

/// Label for a request path. Unknown paths share one label so scanners
/// cannot grow the series count.
pub fn metric_path(path: &str) -> &'static str {
    KNOWN_PATHS
        .iter()
        .find(|known| **known == path)
        .copied()
        .unwrap_or(OTHER_PATH)
}

pub fn record_http_request(method: &str, path: &'static str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path).increment(1);
}

pub fn record_http_response(method: &str, path: &'static str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_http_duration(method: &str, path: &'static str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path
    )
    .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_reset() {
        let metrics = RequestMetrics::new();
        metrics.record_request();
        metrics.record_request();
        metrics.record_unauthorized();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                requests: 2,
                unauthorized: 1
            }
        );

        metrics.reset();
        assert_eq!(metrics.snapshot().requests, 0);
        assert_eq!(metrics.snapshot().unauthorized, 0);
    }

    #[test]
    fn test_metric_path() {
        assert_eq!(metric_path("/api/login"), "/api/login");
        assert_eq!(metric_path("/api/users/me"), "/api/users/me");
        assert_eq!(metric_path("/wp-login.php"), "other");
        assert_eq!(metric_path("/api/users/123"), "other");
    }

    #[test]
    fn test_http_series_recorded() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            record_http_request("POST", "/api/login");
            record_http_response("POST", "/api/login", 401);
            record_http_duration("POST", "/api/login", 0.02);
        });

        let rendered = handle.render();
        let line = |name: &str| {
            rendered
                .lines()
                .find(|l| l.starts_with(name))
                .unwrap_or_else(|| panic!("{} missing from:\n{}", name, rendered))
                .to_string()
        };

        let requests = line("http_requests_total{");
        assert!(requests.contains(r#"path="/api/login""#));
        assert!(requests.ends_with(" 1"));

        let responses = line("http_responses_total{");
        assert!(responses.contains(r#"status="401""#));
        assert!(responses.ends_with(" 1"));

        assert!(line("http_request_duration_seconds_count{").ends_with(" 1"));
    }
}
