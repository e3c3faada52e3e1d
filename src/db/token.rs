//! Refresh token storage for rotation and reuse detection.
//!
//! Each user has at most one active refresh token. Access tokens are
//! stateless and never stored.

use sqlx::sqlite::SqlitePool;

/// The active refresh token of a user.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub user_id: i64,
    pub token: String,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
}

/// Store for managing active refresh tokens.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the active refresh token of a user.
    pub async fn find_by_principal(
        &self,
        user_id: i64,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        sqlx::query_as("SELECT user_id, token, expires_at FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Look up a record by its exact token value.
    pub async fn find_by_token_value(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        sqlx::query_as("SELECT user_id, token, expires_at FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
    }

    /// Insert the user's refresh token, replacing any previous one.
    pub async fn upsert(&self, user_id: i64, token: &str, expires_at: u64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                token = excluded.token,
                expires_at = excluded.expires_at,
                updated_at = datetime('now')",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replace `current` with `next` only if `current` is still the user's
    /// active token. Returns false if another rotation got there first.
    pub async fn rotate(
        &self,
        user_id: i64,
        current: &str,
        next: &str,
        expires_at: u64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET token = ?, expires_at = ?, updated_at = datetime('now')
             WHERE user_id = ? AND token = ?",
        )
        .bind(next)
        .bind(expires_at as i64)
        .bind(user_id)
        .bind(current)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete the user's refresh token (logout). Returns false if there was none.
    pub async fn delete_by_principal(&self, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all records expired as of `now`.
    pub async fn delete_expired(&self, now: u64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(now as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
