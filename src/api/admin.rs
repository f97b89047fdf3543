//! Admin endpoints.
//!
//! - GET `/metrics` - Request counters as an HTML page
//! - POST `/reset` - Clear counters and all stored data (dev platform only)

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::cli::Platform;
use crate::db::Database;
use crate::metrics::RequestMetrics;

/// State for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub db: Database,
    pub metrics: Arc<RequestMetrics>,
    pub platform: Platform,
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/reset", post(reset))
        .with_state(state)
}

async fn metrics(State(state): State<AdminState>) -> impl IntoResponse {
    let snapshot = state.metrics.snapshot();

    Html(format!(
        "<html>
<body>
    <h1>Welcome, Pursuit admin</h1>
    <p>Pursuit has been visited {} times!</p>
    <p>Unauthorized responses: {}</p>
</body>
</html>
",
        snapshot.requests, snapshot.unauthorized
    ))
}

async fn reset(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    if state.platform != Platform::Dev {
        return Err(ApiError::forbidden(
            "Reset is only allowed in dev environment",
        ));
    }

    state.metrics.reset();
    state.db.reset().await.db_err("Failed to reset database")?;

    tracing::warn!("Metrics and database reset");

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Hits reset to 0 and database reset",
    ))
}
