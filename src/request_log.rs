//! Request logging middleware.
//!
//! Counts every request, feeds the per-route metrics series, and picks a log level from the outcome: slow requests
//! and server errors are warnings, client errors are info, and polling
//! endpoints stay at debug so they do not flood the log.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::{debug, info, warn};

use crate::metrics::{
    RequestMetrics, metric_path, record_http_duration, record_http_request, record_http_response,
};

/// Requests slower than this are logged as warnings.
pub const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(5);

/// Endpoints where a 401 may indicate credential guessing.
const CRITICAL_ENDPOINTS: [&str; 3] = ["/admin/metrics", "/admin/reset", "/api/login"];

/// Endpoints hit often enough that success is only worth a debug line.
const HIGH_FREQUENCY_ENDPOINTS: [&str; 1] = ["/api/healthz"];

pub fn is_critical_endpoint(path: &str) -> bool {
    CRITICAL_ENDPOINTS.contains(&path)
}

pub fn is_high_frequency_endpoint(path: &str) -> bool {
    HIGH_FREQUENCY_ENDPOINTS.contains(&path)
}

/// Outermost middleware: counts and logs every request.
pub async fn log_requests(
    State(metrics): State<Arc<RequestMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let label = metric_path(&path);

    metrics.record_request();
    record_http_request(method.as_str(), label);

    let response = next.run(request).await;

    let status = response.status();
    let elapsed = start.elapsed();
    record_http_response(method.as_str(), label, status.as_u16());
    record_http_duration(method.as_str(), label, elapsed.as_secs_f64());
    let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    if status == StatusCode::UNAUTHORIZED {
        metrics.record_unauthorized();
        if is_critical_endpoint(&path) {
            warn!(%method, %path, "Unauthorized request to critical endpoint");
        }
    }

    if elapsed > SLOW_REQUEST_THRESHOLD {
        warn!(%method, %path, status = status.as_u16(), duration_ms, "Slow request");
    } else if status.is_server_error() {
        warn!(%method, %path, status = status.as_u16(), duration_ms, "Request failed");
    } else if status.is_client_error() {
        info!(%method, %path, status = status.as_u16(), duration_ms, "Request rejected");
    } else if is_high_frequency_endpoint(&path) {
        debug!(%method, %path, status = status.as_u16(), duration_ms, "Request");
    } else {
        info!(%method, %path, status = status.as_u16(), duration_ms, "Request");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        middleware,
        routing::{get, post},
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    async fn ok() -> &'static str {
        "OK"
    }

    async fn unauthorized() -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    async fn unavailable() -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    #[test]
    fn test_endpoint_classes() {
        assert!(is_critical_endpoint("/api/login"));
        assert!(is_critical_endpoint("/admin/reset"));
        assert!(!is_critical_endpoint("/api/users"));
        assert!(is_high_frequency_endpoint("/api/healthz"));
        assert!(!is_high_frequency_endpoint("/api/login"));
    }

    #[tokio::test]
    async fn test_counts_requests_and_unauthorized() {
        let metrics = Arc::new(RequestMetrics::new());
        let app = Router::new()
            .route("/ok", get(ok))
            .route("/denied", get(unauthorized))
            .layer(middleware::from_fn_with_state(metrics.clone(), log_requests));

        for uri in ["/ok", "/denied", "/ok"] {
            let request = axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap();
            app.clone().oneshot(request).await.unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 3);
        assert_eq!(snapshot.unauthorized, 1);
    }

    // The only test in this binary that installs a global recorder.
    #[tokio::test]
    async fn test_emits_route_series() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        assert!(::metrics::set_global_recorder(recorder).is_ok());

        let app = Router::new()
            .route("/admin/reset", post(unavailable))
            .layer(middleware::from_fn_with_state(
                Arc::new(RequestMetrics::new()),
                log_requests,
            ));

        for uri in ["/admin/reset", "/nowhere"] {
            let request = axum::http::Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            app.clone().oneshot(request).await.unwrap();
        }

        let rendered = handle.render();
        let series = |name: &str, parts: &[&str]| {
            rendered.lines().any(|line| {
                line.starts_with(name) && parts.iter().all(|part| line.contains(part))
            })
        };

        assert!(series(
            "http_requests_total{",
            &[r#"method="POST""#, r#"path="/admin/reset""#, "} 1"]
        ));
        assert!(series(
            "http_responses_total{",
            &[r#"path="/admin/reset""#, r#"status="503""#, "} 1"]
        ));
        assert!(series(
            "http_responses_total{",
            &[r#"method="POST""#, r#"path="other""#, r#"status="404""#, "} 1"]
        ));
        assert!(series(
            "http_request_duration_seconds_count{",
            &[r#"path="/admin/reset""#, "} 1"]
        ));
    }
}
