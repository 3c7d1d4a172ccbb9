pub mod client;

pub use client::{FeedSource, HttpFeedClient, StaticFeed};
