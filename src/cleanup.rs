//! Scheduled cleanup of stale refresh tokens.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::clock::Clock;
use crate::db::Database;

/// How long revoked tokens are kept before deletion.
const REVOKED_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once.
pub async fn run_cleanup(db: &Database, clock: &dyn Clock) {
    let now = clock.now();
    let revoked_before = now.saturating_sub(REVOKED_RETENTION.as_secs());

    match db.refresh_tokens().delete_stale(now, revoked_before).await {
        Ok(count) if count > 0 => info!("Cleaned up {} stale refresh tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up refresh tokens: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database, clock: Arc<dyn Clock>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&db, clock.as_ref()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const DAY: u64 = 24 * 60 * 60;

    #[tokio::test]
    async fn test_removes_expired_and_old_revoked_tokens() {
        let db = Database::open(":memory:").await.unwrap();
        let user = db
            .users()
            .create("a@example.com", "alice", "hash")
            .await
            .unwrap();
        let clock = ManualClock::new(100 * DAY);
        let tokens = db.refresh_tokens();

        let expired = "a".repeat(64);
        let old_revoked = "b".repeat(64);
        let fresh_revoked = "c".repeat(64);
        let active = "d".repeat(64);

        tokens.create(user.id, &expired, 0, 50 * DAY).await.unwrap();
        for t in [&old_revoked, &fresh_revoked, &active] {
            tokens.create(user.id, t, 90 * DAY, 150 * DAY).await.unwrap();
        }
        tokens.revoke(&old_revoked, 91 * DAY).await.unwrap();
        tokens.revoke(&fresh_revoked, 99 * DAY).await.unwrap();

        run_cleanup(&db, &clock).await;

        assert!(tokens.get_by_token(&expired).await.unwrap().is_none());
        assert!(tokens.get_by_token(&old_revoked).await.unwrap().is_none());
        assert!(tokens.get_by_token(&fresh_revoked).await.unwrap().is_some());
        assert!(tokens.get_by_token(&active).await.unwrap().is_some());
    }
}
