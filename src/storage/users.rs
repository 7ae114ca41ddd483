use chrono::Utc;
use uuid::Uuid;

use super::schema::Database;
use super::types::{to_millis, StorageError, User, UserRow};

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user. Names are unique; a taken name is `StorageError::Constraint`.
    pub async fn create_user(&self, name: &str) -> Result<User, StorageError> {
        let now = to_millis(Utc::now());
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (id, name, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, created_at, updated_at
        "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_user())
    }

    pub async fn get_user_by_name(&self, name: &str) -> Result<User, StorageError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, name, created_at, updated_at FROM users WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        row.map(UserRow::into_user)
            .ok_or_else(|| StorageError::NotFound(format!("User {name}")))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT id, name, created_at, updated_at FROM users ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(UserRow::into_user).collect())
    }

    /// Delete every user. Their feeds, follows and posts go with them.
    ///
    /// Returns the number of users removed.
    pub async fn delete_all_users(&self) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
