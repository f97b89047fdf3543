//! Client IP extraction utilities.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

/// Extract the client IP address.
///
/// Uses the first hop of `X-Forwarded-For` when a reverse proxy set it,
/// otherwise the socket address from `ConnectInfo`.
pub fn extract_client_ip<B>(request: &Request<B>) -> Option<String> {
    if let Some(first_ip) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        let ip = first_ip.trim();
        if !ip.is_empty() {
            return Some(ip.to_string());
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}
