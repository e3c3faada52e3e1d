//! Scheduled cleanup of expired refresh tokens.

use crate::db::Database;
use crate::jwt::now_secs;
use std::time::Duration;
use tracing::{error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once. Returns the number of deleted tokens.
pub async fn run_cleanup(db: &Database) -> u64 {
    match db.refresh_tokens().delete_expired(now_secs()).await {
        Ok(count) if count > 0 => {
            info!("Cleaned up {} expired refresh tokens", count);
            count
        }
        Ok(_) => 0,
        Err(e) => {
            error!("Failed to clean up expired refresh tokens: {}", e);
            0
        }
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(db: Database) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&db).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cleanup_removes_only_expired_tokens() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db.users().create("alice", "hash", "Alice").await.unwrap();
        let bob = db.users().create("bob", "hash", "Bob").await.unwrap();

        db.refresh_tokens().upsert(alice, "old", 1_000).await.unwrap();
        db.refresh_tokens()
            .upsert(bob, "fresh", now_secs() + 3600)
            .await
            .unwrap();

        assert_eq!(run_cleanup(&db).await, 1);
        assert!(db.refresh_tokens().find_by_principal(alice).await.unwrap().is_none());
        assert!(db.refresh_tokens().find_by_principal(bob).await.unwrap().is_some());

        assert_eq!(run_cleanup(&db).await, 0);
    }
}
