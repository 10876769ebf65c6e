//! User and user-token queries (the identity tables).

use tabula_core::db::unix_timestamp_ms;

use super::db::{DatabaseError, GameDatabase};
use super::models::User;

impl GameDatabase {
    // =========================================================================
    // User queries
    // =========================================================================

    /// Create a new user.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        screen_name: &str,
    ) -> Result<User, DatabaseError> {
        let now = unix_timestamp_ms();

        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, screen_name, creation_time) VALUES (?, ?, ?, ?)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(screen_name)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(result.last_insert_rowid()).await
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: i64) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Get a user by email address.
    pub async fn get_user_by_email(&self, email: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with email {email}")))
    }

    /// Get a user by screen name.
    pub async fn get_user_by_screen_name(&self, screen_name: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE screen_name = ?")
            .bind(screen_name)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with screen name {screen_name}")))
    }

    /// Resolve a bearer token to its user.
    pub async fn get_user_by_token(&self, token: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(
            "SELECT u.* FROM tokens t JOIN users u ON t.user_id = u.id WHERE t.token = ?",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound("token".to_string()))
    }

    /// Mark a user's email address as verified.
    pub async fn set_email_verified(&self, user_id: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET email_verified = 1 WHERE id = ?")
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Replace a user's password hash.
    pub async fn update_password(
        &self,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    // =========================================================================
    // Token queries
    // =========================================================================

    /// Bind a fresh bearer token to a user.
    pub async fn insert_token(&self, user_id: i64, token: &str) -> Result<(), DatabaseError> {
        let now = unix_timestamp_ms();

        sqlx::query("INSERT INTO tokens (user_id, token, creation_time) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(token)
            .bind(now)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Revoke all tokens for a user (e.g. after a password change).
    pub async fn delete_user_tokens(&self, user_id: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
