//! User registration and profile endpoints.
//!
//! - POST `/users` - Register and receive a token pair (rate limited)
//! - GET `/users`, GET `/users/me` - Current user
//! - PUT `/users` - Replace email, username and password of the current user

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::error::{ApiError, ResultExt};
use super::session::{SessionResponse, issue_session};
use crate::auth::{AuthenticatedIdentity, require_auth};
use crate::clock::Clock;
use crate::db::{Database, User, is_unique_violation};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password::hash_password;
use crate::rate_limit::{RateLimitConfig, rate_limit_signup};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub clock: Arc<dyn Clock>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState, rate_limit: Arc<RateLimitConfig>) -> Router {
    let signup_limit = middleware::from_fn_with_state(rate_limit, rate_limit_signup);
    let auth = middleware::from_fn_with_state(state.clone(), require_auth::<UsersState>);

    Router::new()
        .route(
            "/users",
            post(create_user).layer(signup_limit).merge(
                get(get_current_user)
                    .put(update_user)
                    .layer(auth.clone()),
            ),
        )
        .route("/users/me", get(get_current_user).layer(auth))
        .with_state(state)
}

/// Public view of a user. The password hash never leaves the server.
#[derive(Serialize)]
pub(super) struct UserResponse {
    id: Uuid,
    created_at: String,
    updated_at: String,
    email: String,
    username: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at,
            updated_at: user.updated_at,
            email: user.email,
            username: user.username,
        }
    }
}

#[derive(Deserialize)]
struct UserRequest {
    email: String,
    username: String,
    password: String,
}

impl UserRequest {
    /// Trim and check the fields. Returns `(email, username)`.
    fn validated(&self) -> Result<(&str, &str), ApiError> {
        let email = self.email.trim();
        let username = self.username.trim();

        if email.is_empty() {
            return Err(ApiError::bad_request("Email cannot be empty"));
        }
        if !email.contains('@') {
            return Err(ApiError::bad_request("Email is not valid"));
        }
        if username.is_empty() {
            return Err(ApiError::bad_request("Username cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(ApiError::bad_request("Password cannot be empty"));
        }

        Ok((email, username))
    }
}

/// Hash a password on the blocking pool.
async fn hash_in_background(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            error!("Password hashing task failed: {}", e);
            ApiError::internal("Failed to hash password")
        })?
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            ApiError::internal("Failed to hash password")
        })
}

fn conflict_or_db_err(context: &str, e: sqlx::Error) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::conflict("Email or username is already taken")
    } else {
        ApiError::db_error(context, e)
    }
}

async fn create_user(
    State(state): State<UsersState>,
    Json(payload): Json<UserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, username) = payload.validated()?;

    let hashed_password = hash_in_background(payload.password.clone()).await?;

    let user = state
        .db
        .users()
        .create(email, username, &hashed_password)
        .await
        .map_err(|e| conflict_or_db_err("Failed to create user", e))?;

    let now = state.clock.now();
    let tokens = issue_session(&state.db, &state.jwt, now, user.id).await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new(user, tokens)),
    ))
}

async fn get_current_user(
    State(state): State<UsersState>,
    identity: AuthenticatedIdentity,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(identity.user_id())
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}

async fn update_user(
    State(state): State<UsersState>,
    identity: AuthenticatedIdentity,
    Json(payload): Json<UserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, username) = payload.validated()?;

    let hashed_password = hash_in_background(payload.password.clone()).await?;

    let user = state
        .db
        .users()
        .update(identity.user_id(), email, username, &hashed_password)
        .await
        .map_err(|e| conflict_or_db_err("Failed to update user", e))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, username: &str, password: &str) -> UserRequest {
        UserRequest {
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_validation_trims() {
        let req = request("  a@example.com ", " alice ", "pw");
        assert_eq!(req.validated().unwrap(), ("a@example.com", "alice"));
    }

    #[test]
    fn test_validation_rejects() {
        for req in [
            request("", "alice", "pw"),
            request("   ", "alice", "pw"),
            request("no-at-sign", "alice", "pw"),
            request("a@example.com", "", "pw"),
            request("a@example.com", "alice", ""),
        ] {
            assert!(matches!(req.validated(), Err(ApiError::BadRequest(_))));
        }
    }
}
