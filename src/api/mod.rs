mod admin;
mod error;
mod health;
mod session;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::cli::Platform;
use crate::clock::Clock;
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::metrics::RequestMetrics;
use crate::rate_limit::RateLimitConfig;

pub use admin::AdminState;
pub use error::{ApiError, ResultExt, redact_server_errors};
pub use session::SessionState;
pub use users::UsersState;

/// Create the API router, mounted under `/api`.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    clock: Arc<dyn Clock>,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    let session_state = session::SessionState {
        db: db.clone(),
        jwt: jwt.clone(),
        clock: clock.clone(),
    };

    let users_state = users::UsersState { db, jwt, clock };

    Router::new()
        .merge(health::router())
        .merge(session::router(session_state, rate_limit.clone()))
        .merge(users::router(users_state, rate_limit))
}

/// Create the admin router, mounted under `/admin`.
pub fn create_admin_router(
    db: Database,
    metrics: Arc<RequestMetrics>,
    platform: Platform,
) -> Router {
    admin::router(admin::AdminState {
        db,
        metrics,
        platform,
    })
}
