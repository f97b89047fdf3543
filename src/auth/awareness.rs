//! Browser detection for choosing how the access token is delivered.
//!
//! Classification is a substring match on `User-Agent`. Browsers that do not
//! advertise one of the markers are treated as programmatic clients.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

/// Markers of common browser engines.
const BROWSER_MARKERS: [&str; 3] = ["Mozilla", "Chrome", "Safari"];

/// Whether the request came from a browser or from a programmatic client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    Browser,
    ProgrammaticClient,
}

impl ClientMode {
    pub fn from_user_agent(user_agent: &str) -> Self {
        if BROWSER_MARKERS.iter().any(|m| user_agent.contains(m)) {
            ClientMode::Browser
        } else {
            ClientMode::ProgrammaticClient
        }
    }

    pub fn is_browser(self) -> bool {
        self == ClientMode::Browser
    }
}

#[derive(Clone, Copy)]
struct ClientModeSlot(ClientMode);

/// Middleware that classifies the client and stores the result for the handler.
pub async fn detect_client_mode(mut request: Request, next: Next) -> Response {
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let mode = ClientMode::from_user_agent(user_agent);
    request.extensions_mut().insert(ClientModeSlot(mode));

    next.run(request).await
}

/// Reads the mode stored by [`detect_client_mode`]. Routes without that layer
/// are always programmatic.
impl<S> FromRequestParts<S> for ClientMode
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ClientModeSlot>()
            .map(|slot| slot.0)
            .unwrap_or(ClientMode::ProgrammaticClient))
    }
}
