//! Handlers for the operator CLI.
//!
//! Each handler writes its human-readable output to `out` so the binary can
//! hand it stdout and tests can hand it a buffer.

use anyhow::{bail, Context, Result};
use std::io::Write;

use crate::config::Config;
use crate::storage::{Database, StorageError, User};
use crate::util::validate_feed_url;

/// Default number of posts shown by `browse`.
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

/// Resolve the logged-in user, failing if nobody is logged in or the user
/// has since been deleted.
pub async fn require_user(db: &Database) -> Result<User> {
    let Some(name) = db.current_user().await? else {
        bail!("Not logged in. Run `gator login <name>` or `gator register <name>` first");
    };
    match db.get_user_by_name(&name).await {
        Ok(user) => Ok(user),
        Err(StorageError::NotFound(_)) => {
            bail!("Logged-in user {name} no longer exists. Run `gator login <name>`")
        }
        Err(e) => Err(e.into()),
    }
}

/// Feed URLs are stored in `url::Url`'s serialization; look them up the same way.
fn lookup_url(raw: &str) -> String {
    let raw = raw.trim();
    url::Url::parse(raw)
        .map(String::from)
        .unwrap_or_else(|_| raw.to_string())
}

pub async fn register(db: &Database, name: &str, out: &mut impl Write) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("User name cannot be empty");
    }

    let user = match db.create_user(name).await {
        Ok(user) => user,
        Err(StorageError::Constraint(_)) => bail!("User {name} already exists"),
        Err(e) => return Err(e).context("Failed to create user"),
    };
    db.set_current_user(Some(&user.name)).await?;

    tracing::info!(user = %user.name, id = %user.id, "Registered user");
    writeln!(out, "User {} created", user.name)?;
    writeln!(out, " * ID:      {}", user.id)?;
    writeln!(out, " * Created: {}", user.created_at.format("%Y-%m-%d %H:%M:%S"))?;
    Ok(())
}

pub async fn login(db: &Database, name: &str, out: &mut impl Write) -> Result<()> {
    let user = db
        .get_user_by_name(name)
        .await
        .with_context(|| format!("Couldn't log in as {name}"))?;
    db.set_current_user(Some(&user.name)).await?;

    writeln!(out, "Logged in as {}", user.name)?;
    Ok(())
}

pub async fn users(db: &Database, out: &mut impl Write) -> Result<()> {
    let current = db.current_user().await?;
    let users = db.list_users().await.context("Failed to list users")?;

    if users.is_empty() {
        writeln!(out, "No users registered")?;
        return Ok(());
    }
    for user in users {
        if current.as_deref() == Some(user.name.as_str()) {
            writeln!(out, "* {} (current)", user.name)?;
        } else {
            writeln!(out, "* {}", user.name)?;
        }
    }
    Ok(())
}

/// Deletes every user (and with them every feed, follow and post) and logs out.
pub async fn reset(db: &Database, out: &mut impl Write) -> Result<()> {
    let removed = db
        .delete_all_users()
        .await
        .context("Failed to reset database")?;
    db.set_current_user(None).await?;

    tracing::info!(users = removed, "Database reset");
    writeln!(out, "Database reset: removed {removed} users")?;
    Ok(())
}

/// Adds a feed owned by the current user and follows it.
pub async fn add_feed(
    db: &Database,
    config: &Config,
    name: &str,
    url: &str,
    out: &mut impl Write,
) -> Result<()> {
    let user = require_user(db).await?;
    let url = validate_feed_url(url, config.allow_private_hosts)
        .with_context(|| format!("Refusing to add feed {url}"))?;

    let feed = match db.create_feed(name.trim(), url.as_str(), user.id).await {
        Ok(feed) => feed,
        Err(StorageError::Constraint(_)) => bail!("A feed with URL {url} already exists"),
        Err(e) => return Err(e).context("Failed to create feed"),
    };
    db.create_feed_follow(user.id, feed.id)
        .await
        .context("Feed created but following it failed")?;

    tracing::info!(feed = %feed.name, url = %feed.url, user = %user.name, "Added feed");
    writeln!(out, "Feed created:")?;
    writeln!(out, " * ID:   {}", feed.id)?;
    writeln!(out, " * Name: {}", feed.name)?;
    writeln!(out, " * URL:  {}", feed.url)?;
    writeln!(out, "{} now follows {}", user.name, feed.name)?;
    Ok(())
}

pub async fn feeds(db: &Database, out: &mut impl Write) -> Result<()> {
    let feeds = db.list_feeds().await.context("Failed to list feeds")?;
    if feeds.is_empty() {
        writeln!(out, "No feeds found")?;
        return Ok(());
    }

    writeln!(out, "Found {} feeds:", feeds.len())?;
    for entry in feeds {
        let fetched = entry
            .feed
            .last_fetched_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        writeln!(out, "* {}", entry.feed.name)?;
        writeln!(out, "  URL:          {}", entry.feed.url)?;
        writeln!(out, "  Added by:     {}", entry.owner_name)?;
        writeln!(out, "  Last fetched: {fetched}")?;
    }
    Ok(())
}

pub async fn follow(db: &Database, url: &str, out: &mut impl Write) -> Result<()> {
    let user = require_user(db).await?;
    let feed = db.get_feed_by_url(&lookup_url(url)).await?;

    match db.create_feed_follow(user.id, feed.id).await {
        Ok(_) => {}
        Err(StorageError::Constraint(_)) => bail!("{} already follows {}", user.name, feed.name),
        Err(e) => return Err(e).context("Failed to follow feed"),
    }

    writeln!(out, "{} now follows {}", user.name, feed.name)?;
    Ok(())
}

pub async fn following(db: &Database, out: &mut impl Write) -> Result<()> {
    let user = require_user(db).await?;
    let follows = db.list_feed_follows_for_user(user.id).await?;

    if follows.is_empty() {
        writeln!(out, "{} is not following any feeds", user.name)?;
        return Ok(());
    }
    writeln!(out, "Feeds followed by {}:", user.name)?;
    for follow in follows {
        writeln!(out, "* {} ({})", follow.feed_name, follow.feed_url)?;
    }
    Ok(())
}

pub async fn unfollow(db: &Database, url: &str, out: &mut impl Write) -> Result<()> {
    let user = require_user(db).await?;
    let feed = db.get_feed_by_url(&lookup_url(url)).await?;

    match db.delete_feed_follow(user.id, feed.id).await {
        Ok(()) => {}
        Err(StorageError::NotFound(_)) => bail!("{} does not follow {}", user.name, feed.name),
        Err(e) => return Err(e).context("Failed to unfollow feed"),
    }

    writeln!(out, "{} unfollowed {}", user.name, feed.name)?;
    Ok(())
}

/// Prints the newest `limit` posts from feeds the current user follows.
pub async fn browse(db: &Database, limit: i64, out: &mut impl Write) -> Result<()> {
    let user = require_user(db).await?;
    let posts = db
        .get_posts_for_user(user.id, limit)
        .await
        .context("Failed to load posts")?;

    if posts.is_empty() {
        writeln!(out, "No posts yet. Run `gator run 1m` to collect some")?;
        return Ok(());
    }

    writeln!(out, "Found {} posts for {}:", posts.len(), user.name)?;
    for entry in posts {
        let post = &entry.post;
        let date = post
            .published_at
            .map(|t| t.format("%a %b %d %Y").to_string())
            .unwrap_or_else(|| "undated".to_string());
        writeln!(out)?;
        writeln!(out, "{} from {}", date, entry.feed_name)?;
        writeln!(out, "--- {} ---", post.title.as_deref().unwrap_or("(untitled)"))?;
        if let Some(description) = &post.description {
            writeln!(out, "    {description}")?;
        }
        writeln!(out, "Link: {}", post.url)?;
        writeln!(out, "=====================================")?;
    }
    Ok(())
}
