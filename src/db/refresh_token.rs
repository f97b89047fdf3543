//! Refresh token storage.
//!
//! Only refresh tokens are persisted. Access tokens are stateless. Rows are
//! never consulted for validity here; callers decide using their own clock.

use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use super::user::{User, UserRow};

/// A refresh token joined to the user that owns it.
#[derive(Debug, Clone)]
pub struct RefreshSession {
    pub user: User,
    pub expires_at: u64,
    pub revoked_at: Option<u64>,
}

#[derive(sqlx::FromRow)]
struct RefreshSessionRow {
    id: String,
    email: String,
    username: String,
    hashed_password: String,
    created_at: String,
    updated_at: String,
    expires_at: i64,
    revoked_at: Option<i64>,
}

impl TryFrom<RefreshSessionRow> for RefreshSession {
    type Error = sqlx::Error;

    fn try_from(row: RefreshSessionRow) -> Result<Self, Self::Error> {
        let user = User::try_from(UserRow {
            id: row.id,
            email: row.email,
            username: row.username,
            hashed_password: row.hashed_password,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })?;

        Ok(Self {
            user,
            expires_at: from_db_time(row.expires_at)?,
            revoked_at: row.revoked_at.map(from_db_time).transpose()?,
        })
    }
}

/// SQLite integers are signed; timestamps past `i64::MAX` cannot be stored.
fn to_db_time(secs: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(secs).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

fn from_db_time(secs: i64) -> Result<u64, sqlx::Error> {
    u64::try_from(secs).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Store for refresh tokens.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new refresh token for a user.
    pub async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        created_at: u64,
        expires_at: u64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token)
        .bind(user_id.to_string())
        .bind(to_db_time(created_at)?)
        .bind(to_db_time(expires_at)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Look up a refresh token together with its owner.
    /// Expired and revoked rows are returned as-is.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<RefreshSession>, sqlx::Error> {
        let row: Option<RefreshSessionRow> = sqlx::query_as(
            "SELECT u.id, u.email, u.username, u.hashed_password, u.created_at, u.updated_at,
                    t.expires_at, t.revoked_at
             FROM refresh_tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RefreshSession::try_from).transpose()
    }

    /// Mark a token revoked. Returns the number of rows changed, which is 0 for
    /// unknown and already-revoked tokens.
    pub async fn revoke(&self, token: &str, now: u64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = ? WHERE token = ? AND revoked_at IS NULL",
        )
        .bind(to_db_time(now)?)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete tokens that expired before `now`, and tokens revoked before `revoked_before`.
    pub async fn delete_stale(&self, now: u64, revoked_before: u64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens
             WHERE expires_at < ? OR (revoked_at IS NOT NULL AND revoked_at < ?)",
        )
        .bind(to_db_time(now)?)
        .bind(to_db_time(revoked_before)?)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
