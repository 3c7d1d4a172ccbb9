//! Feed source collaborator: a trait plus a JSON-over-HTTP client.

use crate::error::FeedError;
use crate::types::FeedPost;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Anything that can hand the agent a batch of recent posts.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_recent_posts(&self, limit: usize) -> Result<Vec<FeedPost>, FeedError>;
}

/// Client for a JSON feed endpoint.
///
/// `GET <url>?limit=N` must return either a bare array of posts or an object
/// with a `posts` array. Posts may spell the body as `body` or `content`, and
/// the author as a string or an object with a `name`.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    url: String,
    api_key: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedEnvelope {
    List(Vec<WirePost>),
    Wrapped { posts: Vec<WirePost> },
}

#[derive(Debug, Deserialize)]
struct WirePost {
    #[serde(default)]
    id: serde_json::Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "content")]
    body: Option<String>,
    #[serde(default)]
    author: Option<WireAuthor>,
    #[serde(default, alias = "created_at")]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireAuthor {
    Name(String),
    Profile { name: String },
}

impl From<WirePost> for FeedPost {
    fn from(wire: WirePost) -> Self {
        let id = match wire.id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        let author = match wire.author {
            Some(WireAuthor::Name(name)) | Some(WireAuthor::Profile { name }) => name,
            None => String::new(),
        };
        let timestamp = wire.timestamp.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        });
        FeedPost {
            id,
            title: wire.title.unwrap_or_default(),
            body: wire.body.unwrap_or_default(),
            author,
            timestamp,
        }
    }
}

impl HttpFeedClient {
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Parse a feed response body.
    pub fn parse_posts(body: &str) -> Result<Vec<FeedPost>, FeedError> {
        let envelope: FeedEnvelope = serde_json::from_str(body)
            .map_err(|e| FeedError::Unavailable(format!("unparseable feed: {e}")))?;
        let posts = match envelope {
            FeedEnvelope::List(posts) | FeedEnvelope::Wrapped { posts } => posts,
        };
        Ok(posts.into_iter().map(FeedPost::from).collect())
    }
}

#[async_trait]
impl FeedSource for HttpFeedClient {
    async fn fetch_recent_posts(&self, limit: usize) -> Result<Vec<FeedPost>, FeedError> {
        if self.url.is_empty() {
            return Err(FeedError::Unavailable("no feed url configured".into()));
        }

        let mut request = self
            .http
            .get(&self.url)
            .query(&[("sort", "new".to_string()), ("limit", limit.to_string())]);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| FeedError::Unavailable(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FeedError::Unavailable(format!("{status}: {body}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FeedError::Unavailable(format!("failed to read body: {e}")))?;
        let mut posts = Self::parse_posts(&body)?;
        posts.truncate(limit);
        debug!("Fetched {} posts from feed", posts.len());
        Ok(posts)
    }
}

/// Fixed list of posts, optionally slow or failing. Useful for tests and
/// offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    posts: Vec<FeedPost>,
    delay: Option<Duration>,
    unavailable: bool,
}

impl StaticFeed {
    pub fn new(posts: Vec<FeedPost>) -> Self {
        Self {
            posts,
            ..Self::default()
        }
    }

    /// A feed that always reports itself unavailable.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch_recent_posts(&self, limit: usize) -> Result<Vec<FeedPost>, FeedError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(FeedError::Unavailable("static feed offline".into()));
        }
        Ok(self.posts.iter().take(limit).cloned().collect())
    }
}
