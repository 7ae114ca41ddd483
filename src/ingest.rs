//! One ingestion cycle: pick the most overdue feed, fetch it, store its items.
//!
//! The feed is marked fetched *before* the request goes out, so a feed that
//! never answers still rotates to the back of the queue instead of being
//! picked again on every tick.

use thiserror::Error;
use uuid::Uuid;

use crate::feed::{normalize_date, normalize_text, FeedFetcher, FetchError, RawItem};
use crate::storage::{FeedStore, NewPost, StorageError};

/// Why a cycle ended early. Never fatal to the scheduler.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to fetch feed {feed}: {source}")]
    Fetch {
        feed: String,
        #[source]
        source: FetchError,
    },
}

impl IngestError {
    /// The store has no feeds yet; nothing to do until one is added.
    pub fn is_no_feeds(&self) -> bool {
        matches!(self, IngestError::Storage(StorageError::NoFeedsConfigured))
    }
}

/// Outcome of a cycle that got as far as processing items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub feed_id: Uuid,
    pub feed_name: String,
    /// `<item>` elements in the fetched document
    pub items_found: usize,
    pub inserted: usize,
    /// Items skipped or rejected by storage, duplicates included
    pub failed: usize,
}

/// Runs ingestion cycles against a store and a fetcher.
pub struct Ingestor<S, F> {
    store: S,
    fetcher: F,
}

impl<S: FeedStore, F: FeedFetcher> Ingestor<S, F> {
    pub fn new(store: S, fetcher: F) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process exactly one feed.
    ///
    /// Storage failures on individual items are logged and counted; the
    /// remaining items are still attempted and the cycle still succeeds.
    pub async fn ingest_once(&self) -> Result<IngestReport, IngestError> {
        let feed = match self.store.next_feed_due().await {
            Ok(feed) => feed,
            Err(e @ StorageError::NoFeedsConfigured) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Couldn't get next feed to fetch");
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.mark_fetched(feed.id).await {
            tracing::warn!(feed = %feed.name, error = %e, "Failed to mark feed fetched");
            return Err(e.into());
        }

        let parsed = match self.fetcher.fetch(&feed.url).await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(feed = %feed.name, url = %feed.url, error = %e, "Failed to fetch feed");
                return Err(IngestError::Fetch {
                    feed: feed.name,
                    source: e,
                });
            }
        };

        let mut report = IngestReport {
            feed_id: feed.id,
            feed_name: feed.name.clone(),
            items_found: parsed.items.len(),
            inserted: 0,
            failed: 0,
        };

        for item in &parsed.items {
            let Some(post) = post_from_item(feed.id, item) else {
                tracing::warn!(feed = %feed.name, title = %item.title.trim(), "Skipping item without a link");
                report.failed += 1;
                continue;
            };

            match self.store.insert_post(&post).await {
                Ok(_) => report.inserted += 1,
                Err(StorageError::Constraint(reason)) => {
                    tracing::debug!(feed = %feed.name, url = %post.url, reason = %reason, "Post already stored");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(feed = %feed.name, url = %post.url, error = %e, "Failed to store post");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            feed_id = %feed.id,
            inserted = report.inserted,
            "Feed {} collected, {} posts found",
            feed.name,
            report.items_found
        );
        Ok(report)
    }
}

/// Turns a raw item into a post creation request with a fresh id.
///
/// `None` when the item has no link, since the link is the post's identity
/// within its feed.
pub fn post_from_item(feed_id: Uuid, item: &RawItem) -> Option<NewPost> {
    let url = normalize_text(&item.link)?;

    let published_at = normalize_date(&item.pub_date);
    if published_at.is_none() && !item.pub_date.trim().is_empty() {
        tracing::debug!(url = %url, pub_date = %item.pub_date, "Unrecognized pubDate, storing without date");
    }

    Some(NewPost {
        id: Uuid::new_v4(),
        feed_id,
        title: normalize_text(&item.title),
        url,
        description: normalize_text(&item.description),
        published_at,
    })
}
