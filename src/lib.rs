//! gator: an RSS aggregator.
//!
//! A [`scheduler::Scheduler`] wakes up on a fixed interval, asks the
//! [`storage`] layer for the feed fetched least recently, downloads and
//! parses it with [`feed`], and stores each item as a post through
//! [`ingest::Ingestor`]. Failures are logged and retried on the feed's next
//! turn; only a bad interval or an unusable database stops the program.

pub mod commands;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod scheduler;
pub mod storage;
pub mod util;
