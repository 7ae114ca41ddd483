use chrono::Utc;
use uuid::Uuid;

use super::schema::Database;
use super::types::{to_millis, NewPost, Post, PostFeedRow, PostRow, PostWithFeed, StorageError};

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert one post.
    ///
    /// `(feed_id, url)` is unique, so re-ingesting an unchanged feed yields
    /// `StorageError::Constraint` for every item already stored.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post, StorageError> {
        let now = to_millis(Utc::now());
        let row: PostRow = sqlx::query_as(
            r#"
            INSERT INTO posts (id, feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, feed_id, title, url, description, published_at, created_at, updated_at
        "#,
        )
        .bind(post.id)
        .bind(post.feed_id)
        .bind(post.title.as_deref())
        .bind(&post.url)
        .bind(post.description.as_deref())
        .bind(post.published_at.map(to_millis))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_post())
    }

    /// Newest posts from feeds `user_id` follows.
    ///
    /// Ordered by publication date, newest first; posts without a date sort last.
    pub async fn get_posts_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<PostWithFeed>, StorageError> {
        let rows: Vec<PostFeedRow> = sqlx::query_as(
            r#"
                SELECT
                    p.id, p.feed_id, p.title, p.url, p.description, p.published_at,
                    p.created_at, p.updated_at, f.name AS feed_name
                FROM posts p
                JOIN feed_follows ff ON ff.feed_id = p.feed_id
                JOIN feeds f ON f.id = p.feed_id
                WHERE ff.user_id = ?
                ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC
                LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PostWithFeed {
                post: row.post.into_post(),
                feed_name: row.feed_name,
            })
            .collect())
    }

    /// Number of posts stored for a feed.
    pub async fn count_posts_for_feed(&self, feed_id: Uuid) -> Result<i64, StorageError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE feed_id = ?")
            .bind(feed_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
