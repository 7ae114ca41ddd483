use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::schema::Database;
use super::types::{Feed, NewPost, Post, StorageError};

/// The storage operations the ingestion pipeline depends on.
///
/// [`Database`] is the production implementation; tests substitute
/// recording fakes.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// The feed with the oldest `last_fetched_at`, never-fetched first.
    ///
    /// `StorageError::NoFeedsConfigured` when there are no feeds.
    async fn next_feed_due(&self) -> Result<Feed, StorageError>;

    /// Set the feed's `last_fetched_at` to now.
    async fn mark_fetched(&self, feed_id: Uuid) -> Result<(), StorageError>;

    /// Persist one post. `StorageError::Constraint` on a duplicate `(feed_id, url)`.
    async fn insert_post(&self, post: &NewPost) -> Result<Post, StorageError>;
}

#[async_trait]
impl FeedStore for Database {
    async fn next_feed_due(&self) -> Result<Feed, StorageError> {
        Database::next_feed_due(self).await
    }

    async fn mark_fetched(&self, feed_id: Uuid) -> Result<(), StorageError> {
        self.mark_feed_fetched_at(feed_id, Utc::now()).await
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post, StorageError> {
        self.create_post(post).await
    }
}
