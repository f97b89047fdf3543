//! Opaque refresh tokens.
//!
//! A refresh token is 32 bytes from the OS CSPRNG, hex-encoded. It carries no
//! claims; its meaning lives entirely in the `refresh_tokens` table.

use std::time::Duration;

use rand::{TryRngCore, rngs::OsRng};

use crate::db::{RefreshSession, User};

/// Refresh token lifetime: 60 days.
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(60 * 24 * 60 * 60);

const TOKEN_BYTES: usize = 32;

/// Why a refresh token could not be generated or used.
///
/// `NotFound`, `Expired` and `Revoked` are only for logs; clients see one
/// uniform rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshTokenError {
    #[error("entropy source failed: {0}")]
    Entropy(String),
    #[error("refresh token not found")]
    NotFound,
    #[error("refresh token expired")]
    Expired,
    #[error("refresh token revoked")]
    Revoked,
}

/// Generate a new refresh token (64 lowercase hex characters).
pub fn generate_refresh_token() -> Result<String, RefreshTokenError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| RefreshTokenError::Entropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Whether `token` has the shape of a refresh token. Access tokens never do.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Decide whether a looked-up refresh token may mint an access token at `now`.
/// A token is expired only when `now > expires_at`.
pub fn check_refresh_session(
    session: Option<RefreshSession>,
    now: u64,
) -> Result<User, RefreshTokenError> {
    let session = session.ok_or(RefreshTokenError::NotFound)?;

    if session.revoked_at.is_some() {
        return Err(RefreshTokenError::Revoked);
    }
    if now > session.expires_at {
        return Err(RefreshTokenError::Expired);
    }

    Ok(session.user)
}
