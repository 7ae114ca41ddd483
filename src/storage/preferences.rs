use super::schema::Database;
use super::types::StorageError;

/// Preference key holding the name of the logged-in user.
pub const CURRENT_USER_KEY: &str = "session.current_user";

impl Database {
    // ========================================================================
    // User Preferences Operations
    // ========================================================================

    /// Get a single preference value by key.
    ///
    /// Keys use dotted convention: `session.current_user`, etc.
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM user_preferences WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a preference value (UPSERT).
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_preference(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM user_preferences WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Name of the logged-in user, if any.
    pub async fn current_user(&self) -> Result<Option<String>, StorageError> {
        self.get_preference(CURRENT_USER_KEY).await
    }

    /// Switch the logged-in user; `None` logs out.
    pub async fn set_current_user(&self, name: Option<&str>) -> Result<(), StorageError> {
        match name {
            Some(name) => self.set_preference(CURRENT_USER_KEY, name).await,
            None => self.delete_preference(CURRENT_USER_KEY).await,
        }
    }
}
