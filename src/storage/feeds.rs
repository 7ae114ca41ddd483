use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::schema::Database;
use super::types::{to_millis, Feed, FeedOwnerRow, FeedRow, FeedWithOwner, StorageError};

const FEED_COLUMNS: &str = "id, name, url, user_id, created_at, updated_at, last_fetched_at";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Register a feed owned by `user_id`. The URL must not already exist.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: Uuid,
    ) -> Result<Feed, StorageError> {
        let now = to_millis(Utc::now());
        let row: FeedRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO feeds (id, name, url, user_id, created_at, updated_at, last_fetched_at)
            VALUES (?, ?, ?, ?, ?, ?, NULL)
            RETURNING {FEED_COLUMNS}
        "#
        ))
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(url)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_feed())
    }

    pub async fn get_feed_by_url(&self, url: &str) -> Result<Feed, StorageError> {
        let row: Option<FeedRow> =
            sqlx::query_as(&format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?"))
                .bind(url)
                .fetch_optional(&self.pool)
                .await?;

        row.map(FeedRow::into_feed)
            .ok_or_else(|| StorageError::NotFound(format!("Feed {url}")))
    }

    /// All feeds with the name of the user who added them, oldest first.
    pub async fn list_feeds(&self) -> Result<Vec<FeedWithOwner>, StorageError> {
        let rows: Vec<FeedOwnerRow> = sqlx::query_as(
            r#"
                SELECT
                    f.id, f.name, f.url, f.user_id, f.created_at, f.updated_at,
                    f.last_fetched_at, u.name AS owner_name
                FROM feeds f
                JOIN users u ON u.id = f.user_id
                ORDER BY f.created_at, f.rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| FeedWithOwner {
                feed: row.feed.into_feed(),
                owner_name: row.owner_name,
            })
            .collect())
    }

    /// The least-recently fetched feed. Never-fetched feeds come first;
    /// ties go to the feed created earliest.
    pub async fn next_feed_due(&self) -> Result<Feed, StorageError> {
        let row: Option<FeedRow> = sqlx::query_as(&format!(
            r#"
            SELECT {FEED_COLUMNS} FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, rowid ASC
            LIMIT 1
        "#
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(FeedRow::into_feed)
            .ok_or(StorageError::NoFeedsConfigured)
    }

    /// Move the feed's watermark (and `updated_at`) to `at`.
    pub async fn mark_feed_fetched_at(
        &self,
        feed_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let at = to_millis(at);
        let result =
            sqlx::query("UPDATE feeds SET last_fetched_at = ?, updated_at = ? WHERE id = ?")
                .bind(at)
                .bind(at)
                .bind(feed_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("Feed {feed_id}")));
        }
        Ok(())
    }
}
