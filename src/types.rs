//! Shared types used across the wake-cycle engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The five things a wake cycle can do. Exactly one runs per cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    #[default]
    Rest,
    Verify,
    Curate,
    Explore,
    Build,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rest => write!(f, "REST"),
            Self::Verify => write!(f, "VERIFY"),
            Self::Curate => write!(f, "CURATE"),
            Self::Explore => write!(f, "EXPLORE"),
            Self::Build => write!(f, "BUILD"),
        }
    }
}

// ---------------------------------------------------------------------------
// Curiosity queue
// ---------------------------------------------------------------------------

/// Lifecycle of a candidate idea. Entries are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    Pending,
    Mature,
    Built,
    Rejected,
}

impl IdeaStatus {
    /// Pending and mature entries still absorb re-sightings.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Mature)
    }
}

impl fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Mature => write!(f, "mature"),
            Self::Built => write!(f, "built"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A topic the agent has noticed and may eventually build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateIdea {
    pub id: String,
    pub topic: String,
    /// Where the idea was first seen.
    pub source: String,
    /// Every source that has mentioned the idea, in sighting order.
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    pub score: f64,
    pub seen_count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub status: IdeaStatus,
}

impl CandidateIdea {
    /// Age in fractional hours relative to `now`.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.first_seen).num_seconds().max(0) as f64 / 3600.0
    }
}

/// A freshly scored idea, before it has an identity in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct IdeaSubmission {
    pub topic: String,
    pub source: String,
    pub categories: BTreeSet<String>,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Taste ledger
// ---------------------------------------------------------------------------

/// Why something ended up in the ledger. "Considered and rejected" is a
/// different signal from "never saw it".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    #[default]
    ConsideredRejected,
    Ignored,
    Deferred,
    AutoFiltered,
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConsideredRejected => write!(f, "considered_rejected"),
            Self::Ignored => write!(f, "ignored"),
            Self::Deferred => write!(f, "deferred"),
            Self::AutoFiltered => write!(f, "auto_filtered"),
        }
    }
}

/// An immutable entry in the taste ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub subject: String,
    pub reason: String,
    /// Free-form classification axis, e.g. `build_failure` or `scope`.
    pub category: String,
    #[serde(default)]
    pub kind: RejectionKind,
    /// Short hex digest of subject, reason, category and timestamp.
    #[serde(default)]
    pub fingerprint: String,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Cycle state
// ---------------------------------------------------------------------------

/// Number of health samples kept in [`CycleState::health_history`].
pub const HEALTH_HISTORY_LEN: usize = 100;

/// Number of error summaries kept in [`CycleState::errors`].
pub const ERROR_HISTORY_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    pub timestamp: DateTime<Utc>,
    pub score: u8,
}

/// Persistent per-agent counters. `cycle_index` advances by exactly one per
/// successfully flushed wake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleState {
    pub cycle_index: u64,
    pub health_score: u8,
    pub last_action: ActionKind,
    pub last_action_time: Option<DateTime<Utc>>,
    /// Summary of the last action that failed and fell back to REST.
    pub last_failure: Option<String>,
    pub health_history: Vec<HealthSample>,
    /// Most recent error summaries, newest first.
    pub errors: Vec<String>,
}

impl Default for CycleState {
    fn default() -> Self {
        Self {
            cycle_index: 0,
            health_score: 50,
            last_action: ActionKind::Rest,
            last_action_time: None,
            last_failure: None,
            health_history: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl CycleState {
    /// Record a health reading, clamped to [0, 100].
    pub fn update_health(&mut self, score: i64, at: DateTime<Utc>) {
        let clamped = score.clamp(0, 100) as u8;
        self.health_score = clamped;
        self.health_history.push(HealthSample {
            timestamp: at,
            score: clamped,
        });
        if self.health_history.len() > HEALTH_HISTORY_LEN {
            let excess = self.health_history.len() - HEALTH_HISTORY_LEN;
            self.health_history.drain(..excess);
        }
    }

    /// Remember an error summary (newest first, bounded).
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.insert(0, error.into());
        self.errors.truncate(ERROR_HISTORY_LEN);
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// A post fetched from the external feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedPost {
    pub id: String,
    pub title: String,
    #[serde(alias = "content")]
    pub body: String,
    pub author: String,
    pub timestamp: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Cycle report
// ---------------------------------------------------------------------------

/// What a single wake cycle did, returned to the caller and journaled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// Index the decision was made for (the pre-increment value).
    pub cycle_index: u64,
    pub health_score: u8,
    /// The action the policy chose.
    pub chosen: ActionKind,
    /// The action that is recorded for the cycle (REST after a failure).
    pub recorded: ActionKind,
    pub description: String,
    pub summary: String,
    pub success: bool,
    pub finished_at: DateTime<Utc>,
}
