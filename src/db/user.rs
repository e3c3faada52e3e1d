use sqlx::sqlite::SqlitePool;

/// Authority granted to every account created through signup.
pub const ROLE_USER: &str = "ROLE_USER";

/// Authority for administrative endpoints.
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub nickname: String,
    pub created_at: String,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user without any roles. Returns the user ID.
    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        nickname: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO users (username, password_hash, nickname) VALUES (?, ?, ?)")
                .bind(username)
                .bind(password_hash)
                .bind(nickname)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Create a user and grant it the given roles atomically. Returns the user ID.
    pub async fn create_with_roles(
        &self,
        username: &str,
        password_hash: &str,
        nickname: &str,
        roles: &[&str],
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("INSERT INTO users (username, password_hash, nickname) VALUES (?, ?, ?)")
                .bind(username)
                .bind(password_hash)
                .bind(nickname)
                .execute(&mut *tx)
                .await?;
        let id = result.last_insert_rowid();

        for role in roles {
            sqlx::query("INSERT OR IGNORE INTO roles (name) VALUES (?)")
                .bind(role)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT OR IGNORE INTO user_roles (user_id, role_id) SELECT ?, id FROM roles WHERE name = ?",
            )
            .bind(id)
            .bind(role)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, password_hash, nickname, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, password_hash, nickname, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Current authorities of a user, sorted by name.
    pub async fn authorities(&self, id: i64) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT r.name FROM roles r JOIN user_roles ur ON ur.role_id = r.id WHERE ur.user_id = ? ORDER BY r.name",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Grant a role, creating it if unknown. Returns false if already granted.
    pub async fn grant_role(&self, id: i64, role: &str) -> Result<bool, sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO roles (name) VALUES (?)")
            .bind(role)
            .execute(&self.pool)
            .await?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id) SELECT ?, id FROM roles WHERE name = ?",
        )
        .bind(id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke a role. Returns false if it was not granted.
    pub async fn revoke_role(&self, id: i64, role: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_roles WHERE user_id = ? AND role_id = (SELECT id FROM roles WHERE name = ?)",
        )
        .bind(id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check if a username is available.
    pub async fn is_username_available(&self, username: &str) -> Result<bool, sqlx::Error> {
        let count: (i32,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 == 0)
    }

    /// Delete a user by ID. Roles and the refresh token go with it.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
