mod feeds;
mod follows;
mod posts;
mod preferences;
mod schema;
mod store;
mod types;
mod users;

pub use preferences::CURRENT_USER_KEY;
pub use schema::Database;
pub use store::FeedStore;
pub use types::{
    Feed, FeedFollow, FeedWithOwner, FollowedFeed, NewPost, Post, PostWithFeed, StorageError,
    User,
};
