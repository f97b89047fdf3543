//! Session endpoints.
//!
//! - POST `/login` - Exchange email and password for an access and refresh token
//! - POST `/refresh` - Exchange a refresh token for a new access token
//! - POST `/revoke` - Revoke a refresh token
//! - POST `/logout` - Clear the access token cookie and revoke a presented refresh token

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{debug, error, info};
use uuid::Uuid;

use super::error::{ApiError, ResultExt};
use super::users::UserResponse;
use crate::auth::{
    BearerError, ClientMode, auth_cookie, bearer_token, clear_auth_cookie, detect_client_mode,
};
use crate::clock::Clock;
use crate::db::{Database, User};
use crate::jwt::{ACCESS_TOKEN_TTL, AccessToken, JwtConfig};
use crate::password::{hash_password, verify_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_login};
use crate::refresh_token::{
    REFRESH_TOKEN_TTL, check_refresh_session, generate_refresh_token, is_well_formed,
};

const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";
const INVALID_REFRESH_TOKEN: &str = "Invalid or expired refresh token";

/// Hash verified against when the email is unknown, so both failure paths cost
/// the same. Built once; a failure is logged here and login falls back to
/// [`FALLBACK_DUMMY_HASH`].
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| match hash_password("pursuit-timing-equalizer") {
        Ok(hash) => Some(hash),
        Err(e) => {
            error!("Failed to build dummy password hash: {}", e);
            None
        }
    });

/// Precomputed Argon2id hash with the same parameters as [`hash_password`].
const FALLBACK_DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$cHVyc3VpdC10aW1pbmc$3f0Zrb0Yp2mY6mS0bq1mX2qQ2gqSxVdY4V6vB5m0xjE";

fn dummy_hash() -> &'static str {
    DUMMY_HASH.as_deref().unwrap_or(FALLBACK_DUMMY_HASH)
}

#[derive(Clone)]
pub struct SessionState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub clock: Arc<dyn Clock>,
}

pub fn router(state: SessionState, rate_limit: Arc<RateLimitConfig>) -> Router {
    Router::new()
        .route(
            "/login",
            post(login)
                .layer(middleware::from_fn(detect_client_mode))
                .layer(middleware::from_fn_with_state(rate_limit, rate_limit_login)),
        )
        .route("/refresh", post(refresh))
        .route("/revoke", post(revoke))
        .route("/logout", post(logout))
        .with_state(state)
}

/// A freshly issued access and refresh token pair.
pub(super) struct SessionTokens {
    pub access: AccessToken,
    pub refresh_token: String,
}

/// User fields plus both tokens, returned by login and registration.
#[derive(Serialize)]
pub(super) struct SessionResponse {
    #[serde(flatten)]
    user: UserResponse,
    token: String,
    refresh_token: String,
}

impl SessionResponse {
    pub(super) fn new(user: User, tokens: SessionTokens) -> Self {
        Self {
            user: user.into(),
            token: tokens.access.token,
            refresh_token: tokens.refresh_token,
        }
    }
}

/// Sign an access token and persist a new refresh token for `user_id`.
pub(super) async fn issue_session(
    db: &Database,
    jwt: &JwtConfig,
    now: u64,
    user_id: Uuid,
) -> Result<SessionTokens, ApiError> {
    let access = jwt
        .issue_access_token(user_id, ACCESS_TOKEN_TTL, now)
        .map_err(|e| {
            error!("Failed to create access token: {}", e);
            ApiError::internal("Failed to create access token")
        })?;

    let refresh_token = generate_refresh_token().map_err(|e| {
        error!("Failed to create refresh token: {}", e);
        ApiError::internal("Failed to create refresh token")
    })?;

    let expires_at = now.checked_add(REFRESH_TOKEN_TTL.as_secs()).ok_or_else(|| {
        error!(now, "Refresh token expiry overflows");
        ApiError::internal("Failed to create refresh token")
    })?;

    db.refresh_tokens()
        .create(user_id, &refresh_token, now, expires_at)
        .await
        .db_err("Failed to save refresh token")?;

    Ok(SessionTokens {
        access,
        refresh_token,
    })
}

/// Read the bearer token, turning a missing or malformed header into a 400.
fn required_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    bearer_token(headers).map_err(|e| match e {
        BearerError::Missing => ApiError::bad_request("Authorization header is missing"),
        BearerError::Malformed => ApiError::bad_request("Invalid Authorization header format"),
    })
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<SessionState>,
    mode: ClientMode,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(payload.email.trim())
        .await
        .db_err("Failed to look up user")?;

    let stored_hash = user.as_ref().map(|u| u.hashed_password.clone());
    let password = payload.password;
    let verified = tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_password(&password, &hash).is_ok(),
        None => {
            let _ = verify_password(&password, dummy_hash());
            false
        }
    })
    .await
    .map_err(|e| {
        error!("Password verification task failed: {}", e);
        ApiError::internal("Failed to verify password")
    })?;

    let user = match user {
        Some(user) if verified => user,
        _ => return Err(ApiError::unauthorized(INCORRECT_CREDENTIALS)),
    };

    let now = state.clock.now();
    let tokens = issue_session(&state.db, &state.jwt, now, user.id).await?;

    let cookie = if mode.is_browser() {
        let value = auth_cookie(&tokens.access.token, tokens.access.duration);
        Some(HeaderValue::from_str(&value).map_err(|e| {
            error!("Failed to build auth cookie: {}", e);
            ApiError::internal("Failed to create access token")
        })?)
    } else {
        None
    };

    info!(user_id = %user.id, browser = mode.is_browser(), "User logged in");

    let mut response = Json(SessionResponse::new(user, tokens)).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    Ok(response)
}

#[derive(Serialize)]
struct RefreshResponse {
    token: String,
}

async fn refresh(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let refresh_token = required_bearer(&headers)?;
    let now = state.clock.now();

    let session = if is_well_formed(refresh_token) {
        state
            .db
            .refresh_tokens()
            .get_by_token(refresh_token)
            .await
            .db_err("Failed to look up refresh token")?
    } else {
        None
    };

    let user = check_refresh_session(session, now).map_err(|e| {
        info!(reason = %e, "Refresh token rejected");
        ApiError::unauthorized(INVALID_REFRESH_TOKEN)
    })?;

    let access = state
        .jwt
        .issue_access_token(user.id, ACCESS_TOKEN_TTL, now)
        .map_err(|e| {
            error!("Failed to create access token: {}", e);
            ApiError::internal("Failed to create access token")
        })?;

    Ok(Json(RefreshResponse {
        token: access.token,
    }))
}

async fn revoke(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let refresh_token = required_bearer(&headers)?;

    let rows = if is_well_formed(refresh_token) {
        state
            .db
            .refresh_tokens()
            .revoke(refresh_token, state.clock.now())
            .await
            .db_err("Failed to revoke refresh token")?
    } else {
        0
    };

    debug!(rows, "Refresh token revocation processed");

    Ok(StatusCode::NO_CONTENT)
}

/// The cookie is cleared even when revoking the presented refresh token fails;
/// that failure is still reported as a server error.
async fn logout(State(state): State<SessionState>, headers: HeaderMap) -> Response {
    let revoked = match bearer_token(&headers) {
        Ok(refresh_token) if is_well_formed(refresh_token) => state
            .db
            .refresh_tokens()
            .revoke(refresh_token, state.clock.now())
            .await
            .db_err("Failed to revoke refresh token on logout"),
        _ => Ok(0),
    };

    let response = match revoked {
        Ok(rows) => {
            debug!(rows, "Logout processed");
            Json(serde_json::json!({ "message": "Logged out successfully" })).into_response()
        }
        Err(e) => e.into_response(),
    };
    ([(SET_COOKIE, clear_auth_cookie())], response).into_response()
}
