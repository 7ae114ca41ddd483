//! Integration tests for the operator workflow: register, add feeds, follow,
//! collect posts, browse, reset.
//!
//! These run against on-disk databases so that persistence across reopen is
//! covered too; each test uses its own temporary directory.

use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use gator::commands;
use gator::config::Config;
use gator::storage::{Database, FeedStore, NewPost, StorageError};
use pretty_assertions::assert_eq;
use uuid::Uuid;

struct TempDb {
    dir: PathBuf,
}

impl TempDb {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("gator_{name}_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    fn path(&self) -> String {
        self.dir.join("gator.db").to_str().unwrap().to_string()
    }

    async fn open(&self) -> Database {
        Database::open(&self.path()).await.unwrap()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

fn post(feed_id: Uuid, url: &str, day: u32) -> NewPost {
    NewPost {
        id: Uuid::new_v4(),
        feed_id,
        title: Some(format!("Post {day}")),
        url: url.to_string(),
        description: Some("Summary".to_string()),
        published_at: Some(Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap()),
    }
}

#[tokio::test]
async fn test_session_and_data_survive_reopen() {
    let tmp = TempDb::new("reopen");
    {
        let db = tmp.open().await;
        commands::register(&db, "kahya", &mut Vec::new()).await.unwrap();
        commands::add_feed(
            &db,
            &Config::default(),
            "Boot.dev",
            "https://blog.boot.dev/index.xml",
            &mut Vec::new(),
        )
        .await
        .unwrap();
    }

    let db = tmp.open().await;
    assert_eq!(db.current_user().await.unwrap().as_deref(), Some("kahya"));
    let feeds = db.list_feeds().await.unwrap();
    assert_eq!(feeds.len(), 1);
    assert_eq!(feeds[0].feed.url, "https://blog.boot.dev/index.xml");
    assert_eq!(feeds[0].owner_name, "kahya");
}

#[tokio::test]
async fn test_browse_shows_newest_followed_posts() {
    let tmp = TempDb::new("browse");
    let db = tmp.open().await;
    commands::register(&db, "kahya", &mut Vec::new()).await.unwrap();
    commands::add_feed(
        &db,
        &Config::default(),
        "Blog",
        "https://blog.example.com/rss",
        &mut Vec::new(),
    )
    .await
    .unwrap();
    let feed = db
        .get_feed_by_url("https://blog.example.com/rss")
        .await
        .unwrap();

    for (url, day) in [
        ("https://blog.example.com/a", 1),
        ("https://blog.example.com/c", 3),
        ("https://blog.example.com/b", 2),
    ] {
        db.insert_post(&post(feed.id, url, day)).await.unwrap();
    }

    let mut out = Vec::new();
    commands::browse(&db, 2, &mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.starts_with("Found 2 posts for kahya:"));
    let c = out.find("--- Post 3 ---").unwrap();
    let b = out.find("--- Post 2 ---").unwrap();
    assert!(c < b, "newest first:\n{out}");
    assert!(!out.contains("Post 1"));
    assert!(out.contains("Link: https://blog.example.com/c"));
}

#[tokio::test]
async fn test_duplicate_post_through_store_trait() {
    let tmp = TempDb::new("dupe");
    let db = tmp.open().await;
    let user = db.create_user("kahya").await.unwrap();
    let feed = db
        .create_feed("Blog", "https://blog.example.com/rss", user.id)
        .await
        .unwrap();

    db.insert_post(&post(feed.id, "https://blog.example.com/a", 1))
        .await
        .unwrap();
    let err = db
        .insert_post(&post(feed.id, "https://blog.example.com/a", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Constraint(_)), "got {err:?}");
}

#[tokio::test]
async fn test_mark_fetched_rotates_due_feed() {
    let tmp = TempDb::new("rotate");
    let db = tmp.open().await;
    let user = db.create_user("kahya").await.unwrap();
    let a = db
        .create_feed("A", "https://a.example/rss", user.id)
        .await
        .unwrap();
    let b = db
        .create_feed("B", "https://b.example/rss", user.id)
        .await
        .unwrap();

    let due = FeedStore::next_feed_due(&db).await.unwrap();
    assert_eq!(due.id, a.id);
    db.mark_fetched(a.id).await.unwrap();

    let due = FeedStore::next_feed_due(&db).await.unwrap();
    assert_eq!(due.id, b.id);
}

#[tokio::test]
async fn test_reset_removes_everything() {
    let tmp = TempDb::new("reset");
    let db = tmp.open().await;
    commands::register(&db, "kahya", &mut Vec::new()).await.unwrap();
    commands::add_feed(
        &db,
        &Config::default(),
        "Blog",
        "https://blog.example.com/rss",
        &mut Vec::new(),
    )
    .await
    .unwrap();
    let feed = db
        .get_feed_by_url("https://blog.example.com/rss")
        .await
        .unwrap();
    db.insert_post(&post(feed.id, "https://blog.example.com/a", 1))
        .await
        .unwrap();

    commands::reset(&db, &mut Vec::new()).await.unwrap();

    assert!(db.list_users().await.unwrap().is_empty());
    assert!(db.list_feeds().await.unwrap().is_empty());
    assert_eq!(db.count_posts_for_feed(feed.id).await.unwrap(), 0);
    assert!(matches!(
        db.next_feed_due().await.unwrap_err(),
        StorageError::NoFeedsConfigured
    ));

    let err = commands::browse(&db, 2, &mut Vec::new()).await.unwrap_err();
    assert!(err.to_string().starts_with("Not logged in"));
}

#[tokio::test]
async fn test_follow_accepts_unnormalized_url() {
    let tmp = TempDb::new("follow_norm");
    let db = tmp.open().await;
    commands::register(&db, "kahya", &mut Vec::new()).await.unwrap();
    commands::add_feed(
        &db,
        &Config::default(),
        "Root",
        "https://blog.example.com",
        &mut Vec::new(),
    )
    .await
    .unwrap();
    commands::register(&db, "holgith", &mut Vec::new()).await.unwrap();

    // Stored as "https://blog.example.com/"
    let mut out = Vec::new();
    commands::follow(&db, "https://blog.example.com", &mut out)
        .await
        .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "holgith now follows Root\n");
}
