use axum::{Router, http::header::CONTENT_TYPE, response::IntoResponse, routing::get};

pub fn router() -> Router {
    Router::new().route("/healthz", get(healthz))
}

/// Readiness check.
async fn healthz() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/plain; charset=utf-8")], "OK")
}
