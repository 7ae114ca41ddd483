//! Utility functions shared by the CLI and the ingestion pipeline.
//!
//! - **Interval parsing**: `30s`, `1m`, `1h30m` style durations for `gator run`
//! - **URL validation**: refuse non-HTTP and private-network feed URLs
//!
//! # Examples
//!
//! ```
//! use gator::util::{parse_interval, validate_feed_url};
//!
//! let every = parse_interval("90s").unwrap();
//! assert_eq!(every.as_secs(), 90);
//!
//! let url = validate_feed_url("https://example.com/feed.xml", false).unwrap();
//! assert_eq!(url.host_str(), Some("example.com"));
//! ```

mod duration;
mod url_validator;

pub use duration::parse_interval;
pub use url_validator::{validate_feed_url, UrlValidationError};
