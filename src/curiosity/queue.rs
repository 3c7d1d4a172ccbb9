//! Deduplicated, priority-ordered store of candidate ideas.
//!
//! Entries are keyed by a normalised form of their topic. Re-sighting an open
//! entry bumps its counters instead of adding a row; nothing is ever removed.

use crate::config::MaturityConfig;
use crate::error::QueueError;
use crate::types::{CandidateIdea, IdeaStatus, IdeaSubmission};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::cmp::Ordering;
use tracing::debug;

/// Lowercase and collapse runs of whitespace.
pub fn normalize_topic(topic: &str) -> String {
    topic
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable id derived from the normalised topic.
pub fn topic_id(normalized: &str) -> String {
    let digest = Sha3_256::digest(normalized.as_bytes());
    format!("cur-{}", hex::encode(&digest[..6]))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuriosityQueue {
    entries: Vec<CandidateIdea>,
    total_discovered: u64,
}

impl CuriosityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_discovered(&self) -> u64 {
        self.total_discovered
    }

    pub fn entries(&self) -> &[CandidateIdea] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&CandidateIdea> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Insert a new idea, or fold a re-sighting into the open entry with the
    /// same normalised topic. Returns the resulting record.
    pub fn add(&mut self, idea: IdeaSubmission, now: DateTime<Utc>) -> CandidateIdea {
        let key = normalize_topic(&idea.topic);

        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.status.is_open() && normalize_topic(&e.topic) == key)
        {
            existing.seen_count += 1;
            existing.last_seen = now;
            existing.score = existing.score.max(idea.score);
            existing.categories.extend(idea.categories);
            if !existing.sources.contains(&idea.source) {
                existing.sources.push(idea.source);
            }
            debug!(
                "Curiosity '{}' seen again ({}x)",
                existing.topic, existing.seen_count
            );
            return existing.clone();
        }

        // A closed entry may already own the base id; suffix to stay unique.
        let base = topic_id(&key);
        let prior = self
            .entries
            .iter()
            .filter(|e| e.id == base || e.id.starts_with(&format!("{base}-")))
            .count();
        let id = if prior == 0 {
            base
        } else {
            format!("{}-{}", base, prior + 1)
        };

        let record = CandidateIdea {
            id,
            topic: idea.topic.trim().to_string(),
            source: idea.source.clone(),
            sources: vec![idea.source],
            categories: idea.categories,
            score: idea.score.clamp(0.0, 1.0),
            seen_count: 1,
            first_seen: now,
            last_seen: now,
            status: IdeaStatus::Pending,
        };
        self.entries.push(record.clone());
        self.total_discovered += 1;
        debug!("Curiosity '{}' queued as {}", record.topic, record.id);
        record
    }

    /// Open entries that satisfy the maturity predicate, best first.
    ///
    /// Ordering: score desc, then seen_count desc, then earliest first_seen.
    pub fn get_mature(&self, rule: &MaturityConfig, now: DateTime<Utc>) -> Vec<CandidateIdea> {
        let mut mature: Vec<CandidateIdea> = self
            .entries
            .iter()
            .filter(|e| e.status.is_open() && is_mature(e, rule, now))
            .cloned()
            .collect();
        mature.sort_by(compare_priority);
        mature
    }

    /// Persist `pending -> mature` for every entry that has crossed the
    /// maturity threshold. Returns how many changed.
    pub fn promote_matured(&mut self, rule: &MaturityConfig, now: DateTime<Utc>) -> usize {
        let mut promoted = 0;
        for entry in &mut self.entries {
            if entry.status == IdeaStatus::Pending && is_mature(entry, rule, now) {
                entry.status = IdeaStatus::Mature;
                promoted += 1;
            }
        }
        promoted
    }

    pub fn mark(&mut self, id: &str, status: IdeaStatus) -> Result<(), QueueError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        debug!("Curiosity {} {} -> {}", id, entry.status, status);
        entry.status = status;
        Ok(())
    }

    /// Count entries per status: (pending, mature, built, rejected).
    pub fn status_counts(&self) -> (usize, usize, usize, usize) {
        self.entries
            .iter()
            .fold((0, 0, 0, 0), |(p, m, b, r), e| match e.status {
                IdeaStatus::Pending => (p + 1, m, b, r),
                IdeaStatus::Mature => (p, m + 1, b, r),
                IdeaStatus::Built => (p, m, b + 1, r),
                IdeaStatus::Rejected => (p, m, b, r + 1),
            })
    }
}

fn is_mature(entry: &CandidateIdea, rule: &MaturityConfig, now: DateTime<Utc>) -> bool {
    entry.seen_count >= rule.min_seen || entry.age_hours(now) >= rule.min_age_hours
}

fn compare_priority(a: &CandidateIdea, b: &CandidateIdea) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.seen_count.cmp(&a.seen_count))
        .then_with(|| a.first_seen.cmp(&b.first_seen))
}
