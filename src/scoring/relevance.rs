//! Relevance scoring for feed posts.
//!
//! Each configured category contributes a saturating strength built from
//! keyword hits (title hits count more than body hits). Any noise signal
//! forces the score to zero.

use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::types::FeedPost;
use std::collections::BTreeSet;
use tracing::debug;

/// Result of scoring one post.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceScore {
    /// In [0, 1]. Always 0 when `is_noise` is set.
    pub score: f64,
    pub categories: BTreeSet<String>,
    pub is_noise: bool,
}

impl RelevanceScore {
    fn noise() -> Self {
        Self {
            score: 0.0,
            categories: BTreeSet::new(),
            is_noise: true,
        }
    }
}

/// Scores posts against the configured category registry.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    config: ScoringConfig,
}

impl RelevanceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score a post. Never fails: malformed posts come back as noise.
    pub fn score(&self, post: &FeedPost) -> RelevanceScore {
        match self.try_score(post) {
            Ok(score) => score,
            Err(e) => {
                debug!("Treating post '{}' as noise: {}", post.id, e);
                RelevanceScore::noise()
            }
        }
    }

    /// Whether a score is good enough to enter the curiosity queue.
    pub fn qualifies(&self, score: &RelevanceScore) -> bool {
        !score.is_noise
            && score.score >= self.config.min_score
            && score.categories.len() >= self.config.min_categories
    }

    fn try_score(&self, post: &FeedPost) -> Result<RelevanceScore, ScoringError> {
        if post.title.trim().is_empty() && post.body.trim().is_empty() {
            return Err(ScoringError::EmptyPost);
        }
        if post.title.contains('\0') || post.body.contains('\0') {
            return Err(ScoringError::InvalidCharacters);
        }

        let title = post.title.to_lowercase();
        let body = post.body.to_lowercase();

        let mut categories = BTreeSet::new();
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut is_noise = self.is_noise_text(&self.config.noise_signals, &title, &body);

        for (name, category) in &self.config.categories {
            total_weight += category.weight.max(0.0);
            is_noise |= self.is_noise_text(&category.noise_signals, &title, &body);

            let raw: f64 = category
                .keywords
                .iter()
                .map(|kw| {
                    let phrase = kw.phrase.to_lowercase();
                    if phrase.is_empty() {
                        0.0
                    } else if title.contains(&phrase) {
                        kw.weight * self.config.title_boost
                    } else if body.contains(&phrase) {
                        kw.weight
                    } else {
                        0.0
                    }
                })
                .sum();

            if raw > 0.0 {
                let strength = (raw / self.config.saturation.max(f64::EPSILON)).min(1.0);
                weighted += category.weight.max(0.0) * strength;
                categories.insert(name.clone());
            }
        }

        let score = if is_noise || total_weight <= 0.0 {
            0.0
        } else {
            (weighted / total_weight).clamp(0.0, 1.0)
        };

        Ok(RelevanceScore {
            score,
            categories,
            is_noise,
        })
    }

    fn is_noise_text(&self, signals: &[String], title: &str, body: &str) -> bool {
        signals.iter().any(|signal| {
            let signal = signal.to_lowercase();
            !signal.is_empty() && (title.contains(&signal) || body.contains(&signal))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str, body: &str) -> FeedPost {
        FeedPost {
            id: "p1".into(),
            title: title.into(),
            body: body.into(),
            author: "molty".into(),
            timestamp: None,
        }
    }

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::new(ScoringConfig::default())
    }

    #[test]
    fn multi_category_post_qualifies() {
        let s = scorer();
        let result = s.score(&post(
            "Memory decay for autonomous agents",
            "A heartbeat loop that decides what to forget.",
        ));
        assert!(!result.is_noise);
        assert!(result.categories.contains("memory_systems"));
        assert!(result.categories.contains("agent_operations"));
        assert!(result.score >= 0.15, "score was {}", result.score);
        assert!(s.qualifies(&result));
    }

    #[test]
    fn noise_forces_zero_score() {
        let result = scorer().score(&post(
            "Memory decay for autonomous agents",
            "Giveaway! Buy now, limited time heartbeat memory airdrop.",
        ));
        assert!(result.is_noise);
        assert_eq!(result.score, 0.0);
        assert!(!scorer().qualifies(&result));
    }

    #[test]
    fn category_noise_signal_fires() {
        let result = scorer().score(&post("Once upon a memory", "chapter 1 of my fiction"));
        assert!(result.is_noise);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn title_hits_outweigh_body_hits() {
        let s = scorer();
        let in_title = s.score(&post("memory", "nothing relevant here"));
        let in_body = s.score(&post("nothing relevant here", "memory"));
        assert!(in_title.score > in_body.score);
    }

    #[test]
    fn empty_body_scores_title_only() {
        let result = scorer().score(&post("Verify your memory assumptions", ""));
        assert!(!result.is_noise);
        assert!(result.categories.contains("self_awareness"));
        assert!(result.categories.contains("memory_systems"));
    }

    #[test]
    fn unknown_language_scores_zero_without_noise() {
        let result = scorer().score(&post("今日はいい天気です", "散歩に行きましょう"));
        assert!(!result.is_noise);
        assert_eq!(result.score, 0.0);
        assert!(result.categories.is_empty());
    }

    #[test]
    fn malformed_post_is_noise() {
        let blank = scorer().score(&post("   ", ""));
        assert_eq!(blank, RelevanceScore::noise());

        let nul = scorer().score(&post("memory\0", "decay"));
        assert!(nul.is_noise);
        assert_eq!(nul.score, 0.0);
    }

    #[test]
    fn single_category_does_not_qualify() {
        let s = scorer();
        let result = s.score(&post("Memory memory decay archive", "retention"));
        assert_eq!(result.categories.len(), 1);
        assert!(!s.qualifies(&result));
    }

    #[test]
    fn score_is_clipped_to_unit_interval() {
        let s = scorer();
        let result = s.score(&post(
            "memory forget decay assumption belief verify taste rejection identity \
             autonomous wake cycle injection redact sensitive",
            "archive curate retention confidence persona heartbeat credential",
        ));
        assert!(result.score <= 1.0);
        assert!(result.score > 0.9);
    }
}
