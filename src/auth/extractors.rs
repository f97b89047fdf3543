//! Request authentication: credential extraction, validation and the identity extractor.
//!
//! A request moves through extraction (bearer header, then cookie) and
//! validation, and ends either authorized, with an [`AuthenticatedIdentity`]
//! stored in its extensions, or rejected with a 401.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::cookie::{AUTH_COOKIE_NAME, bearer_token, get_cookie};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedIdentity;
use crate::jwt::JwtConfig;

/// Extension slot for the identity. Private, so nothing outside this module
/// can insert or read it except through [`AuthenticatedIdentity`]'s extractor.
#[derive(Clone, Copy)]
struct IdentitySlot(AuthenticatedIdentity);

/// Where the presented token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    BearerHeader,
    Cookie,
}

/// A token presented by the client, not yet validated.
#[derive(Debug, Clone, Copy)]
pub struct Credential<'a> {
    pub token: &'a str,
    pub source: CredentialSource,
}

/// Find the access token in a request: a well-formed bearer header wins,
/// otherwise the `auth-token` cookie.
pub fn extract_credential(headers: &HeaderMap) -> Result<Credential<'_>, AuthErrorKind> {
    if let Ok(token) = bearer_token(headers) {
        return Ok(Credential {
            token,
            source: CredentialSource::BearerHeader,
        });
    }

    match get_cookie(headers, AUTH_COOKIE_NAME) {
        Some(token) if !token.is_empty() => Ok(Credential {
            token,
            source: CredentialSource::Cookie,
        }),
        _ => Err(AuthErrorKind::MissingCredential),
    }
}

/// Authenticate a request's headers at time `now`.
pub fn authenticate(
    headers: &HeaderMap,
    jwt: &JwtConfig,
    now: u64,
) -> Result<AuthenticatedIdentity, AuthErrorKind> {
    let credential = extract_credential(headers)?;
    tracing::debug!(source = ?credential.source, "Validating credential");

    let user_id = jwt
        .validate_access_token(credential.token, now)
        .map_err(AuthErrorKind::InvalidCredential)?;

    Ok(AuthenticatedIdentity::new(user_id))
}

/// Middleware that rejects unauthenticated requests and hands the identity to
/// the wrapped handler.
pub async fn require_auth<S>(State(state): State<S>, mut request: Request, next: Next) -> Response
where
    S: HasAuthBackend + Clone + Send + Sync + 'static,
{
    let now = state.clock().now();

    match authenticate(request.headers(), state.jwt(), now) {
        Ok(identity) => {
            request.extensions_mut().insert(IdentitySlot(identity));
            next.run(request).await
        }
        Err(kind) => {
            tracing::info!(
                method = %request.method(),
                path = %request.uri().path(),
                reason = %kind,
                "Rejected request credential"
            );
            ApiAuthError::new(kind).into_response()
        }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<IdentitySlot>() {
            Some(IdentitySlot(identity)) => Ok(*identity),
            None => {
                tracing::error!(
                    path = %parts.uri.path(),
                    "Route reads the identity but is not behind require_auth"
                );
                Err(ApiAuthError::new(AuthErrorKind::MissingCredential))
            }
        }
    }
}
