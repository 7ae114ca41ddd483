use chrono::Utc;
use uuid::Uuid;

use super::schema::Database;
use super::types::{to_millis, FeedFollow, FeedFollowRow, FollowedFeed, StorageError};

impl Database {
    // ========================================================================
    // Follow Operations
    // ========================================================================

    /// Subscribe `user_id` to `feed_id`. Following twice is a constraint error.
    pub async fn create_feed_follow(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
    ) -> Result<FeedFollow, StorageError> {
        let now = to_millis(Utc::now());
        let row: FeedFollowRow = sqlx::query_as(
            r#"
            INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, user_id, feed_id, created_at, updated_at
        "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(feed_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_follow())
    }

    /// Feeds `user_id` follows, in the order they were followed.
    pub async fn list_feed_follows_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FollowedFeed>, StorageError> {
        let rows: Vec<(Uuid, Uuid, String, String, String)> = sqlx::query_as(
            r#"
                SELECT ff.id, f.id, f.name, f.url, u.name
                FROM feed_follows ff
                JOIN feeds f ON f.id = ff.feed_id
                JOIN users u ON u.id = ff.user_id
                WHERE ff.user_id = ?
                ORDER BY ff.created_at, ff.rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(follow_id, feed_id, feed_name, feed_url, user_name)| FollowedFeed {
                    follow_id,
                    feed_id,
                    feed_name,
                    feed_url,
                    user_name,
                },
            )
            .collect())
    }

    /// Unsubscribe. `NotFound` if the user was not following the feed.
    pub async fn delete_feed_follow(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
    ) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound("Follow".to_string()));
        }
        Ok(())
    }
}
