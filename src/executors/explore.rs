use super::ActionExecutors;
use crate::curiosity::CuriosityQueue;
use crate::error::{ExecutorError, FeedError};
use crate::types::{FeedPost, IdeaSubmission};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

const MAX_TOPIC_CHARS: usize = 80;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExploreReport {
    pub fetched: usize,
    /// Posts that qualified and were offered to the queue.
    pub accepted: usize,
    /// Accepted posts that created a new entry rather than a re-sighting.
    pub new_entries: usize,
    pub filtered: usize,
}

impl ActionExecutors {
    /// Fetch recent posts, score them and queue the qualifying ones.
    pub(crate) async fn explore(
        &self,
        queue: &mut CuriosityQueue,
        now: DateTime<Utc>,
    ) -> Result<ExploreReport, ExecutorError> {
        let settings = &self.settings;
        let fetched = tokio::time::timeout(
            settings.explore_timeout,
            self.feed.fetch_recent_posts(settings.feed_limit),
        )
        .await
        .map_err(|_| ExecutorError::Timeout {
            operation: "feed fetch",
            secs: settings.explore_timeout.as_secs(),
        })?;

        let posts = match fetched {
            Ok(posts) => posts,
            Err(FeedError::Unavailable(reason)) => {
                warn!("Feed unavailable, exploring nothing: {}", reason);
                Vec::new()
            }
        };

        let mut report = ExploreReport {
            fetched: posts.len(),
            ..Default::default()
        };

        for post in &posts {
            let score = self.scorer.score(post);
            if !self.scorer.qualifies(&score) {
                report.filtered += 1;
                continue;
            }
            let Some(topic) = topic_for(post) else {
                report.filtered += 1;
                continue;
            };

            let before = queue.total_discovered();
            let entry = queue.add(
                IdeaSubmission {
                    topic,
                    source: source_for(post),
                    categories: score.categories,
                    score: score.score,
                },
                now,
            );
            report.accepted += 1;
            if queue.total_discovered() > before {
                report.new_entries += 1;
            }
            debug!("Queued '{}' (score {:.2})", entry.topic, entry.score);
        }

        info!(
            "Explored {} posts: {} accepted, {} filtered",
            report.fetched, report.accepted, report.filtered
        );
        Ok(report)
    }
}

/// The post title, or the start of the body for untitled posts.
fn topic_for(post: &FeedPost) -> Option<String> {
    let text = if post.title.trim().is_empty() {
        post.body.trim()
    } else {
        post.title.trim()
    };
    let topic: String = text.chars().take(MAX_TOPIC_CHARS).collect();
    let topic = topic.trim().to_string();
    (!topic.is_empty()).then_some(topic)
}

fn source_for(post: &FeedPost) -> String {
    if post.id.is_empty() {
        "feed".to_string()
    } else {
        format!("feed:{}", post.id)
    }
}
