//! Feed retrieval and canonicalization.
//!
//! - [`fetcher`] - one HTTP GET per feed, body size cap, no retries
//! - [`parser`] - RSS 2.0 `<rss><channel><item>*` into [`ParsedFeed`] with a `quick-xml` event reader
//! - [`normalize`] - trimming text and parsing `pubDate` into UTC
//!
//! # Example
//!
//! ```ignore
//! use gator::feed::{FeedFetcher, HttpFetcher, normalize_date};
//!
//! let fetcher = HttpFetcher::new("gator", None, 10 * 1024 * 1024)?;
//! let feed = fetcher.fetch("https://blog.boot.dev/index.xml").await?;
//! for item in &feed.items {
//!     println!("{:?}", normalize_date(&item.pub_date));
//! }
//! ```

mod fetcher;
mod normalize;
mod parser;

pub use fetcher::{FeedFetcher, FetchError, HttpFetcher};
pub use normalize::{matching_date_format, normalize_date, normalize_text};
pub use parser::{parse_feed, ParseError, ParsedFeed, RawItem};
