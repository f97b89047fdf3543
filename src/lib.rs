pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod clock;
pub mod db;
pub mod jwt;
pub mod metrics;
pub mod password;
pub mod rate_limit;
pub mod refresh_token;
pub mod request_log;

use api::{create_admin_router, create_api_router, redact_server_errors};
use axum::{Router, middleware};
use cli::Platform;
use clock::Clock;
use db::Database;
use jwt::{JwtConfig, JwtError};
use crate::metrics::RequestMetrics;
use rate_limit::RateLimitConfig;
use request_log::log_requests;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Deployment platform
    pub platform: Platform,
    /// Login attempts allowed per minute per client IP
    pub login_per_minute: NonZeroU32,
    /// Signups allowed per minute per client IP
    pub signup_per_minute: NonZeroU32,
    /// Source of the current time for every token decision
    pub clock: Arc<dyn Clock>,
    /// Request counters shared by the logger and the admin endpoints
    pub metrics: Arc<RequestMetrics>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid JWT configuration: {0}")]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Create the application router with the given configuration.
///
/// Layers run outermost first: request logging, server error redaction, then
/// the per-route rate limiting, client detection and authentication.
pub fn create_app(config: &ServerConfig) -> Result<Router, JwtError> {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret)?);
    let rate_limit = Arc::new(RateLimitConfig::new(
        config.login_per_minute,
        config.signup_per_minute,
    ));

    let api_router = create_api_router(config.db.clone(), jwt, config.clock.clone(), rate_limit);
    let admin_router = create_admin_router(
        config.db.clone(),
        config.metrics.clone(),
        config.platform,
    );

    Ok(Router::new()
        .nest("/api", api_router)
        .nest("/admin", admin_router)
        .layer(middleware::from_fn_with_state(
            config.platform,
            redact_server_errors,
        ))
        .layer(middleware::from_fn_with_state(
            config.metrics.clone(),
            log_requests,
        )))
}

/// Run cleanup tasks and spawn background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database, clock: Arc<dyn Clock>) {
    cleanup::run_cleanup(db, clock.as_ref()).await;
    cleanup::spawn_cleanup_scheduler(db.clone(), clock);
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), ServerError> {
    let app = create_app(&config)?;
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await?;
    Ok(())
}
