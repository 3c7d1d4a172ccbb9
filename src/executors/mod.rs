//! Action executors: the side-effecting half of a wake cycle.
//!
//! Each executor works on the cycle's in-memory snapshot and reports what it
//! did. Errors are returned to the wake cycle, which turns them into a REST
//! fallback. External calls (feed fetch, test run) are bounded by timeouts.

pub mod build;
pub mod curate;
pub mod explore;
pub mod verify;

pub use build::BuildReport;
pub use explore::ExploreReport;
pub use verify::VerifyReport;

use crate::assumptions::ASSUMPTIONS_FILE;
use crate::config::{ClawConfig, CurateConfig, VerifyConfig};
use crate::curiosity::CuriosityQueue;
use crate::decision::Decision;
use crate::error::ExecutorError;
use crate::feed::FeedSource;
use crate::memory::CurationReport;
use crate::runner::TestRunner;
use crate::scoring::RelevanceScorer;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Paths and limits the executors need, resolved from the config once.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub feed_limit: usize,
    pub explore_timeout: Duration,
    pub build_timeout: Duration,
    pub artifacts_dir: PathBuf,
    pub memory_dir: PathBuf,
    pub assumptions_path: PathBuf,
    pub verify: VerifyConfig,
    pub curate: CurateConfig,
}

impl ExecutorSettings {
    pub fn from_config(config: &ClawConfig) -> Self {
        Self {
            feed_limit: config.feed.limit,
            explore_timeout: Duration::from_secs(config.wake.explore_timeout_secs),
            build_timeout: Duration::from_secs(config.wake.build_timeout_secs),
            artifacts_dir: config.resolved_artifacts_dir(),
            memory_dir: config.resolved_memory_dir(),
            assumptions_path: config.resolved_state_dir().join(ASSUMPTIONS_FILE),
            verify: config.verify.clone(),
            curate: config.curate.clone(),
        }
    }
}

/// What an action accomplished.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Rested,
    Verified(VerifyReport),
    Curated(CurationReport),
    Explored(ExploreReport),
    Built(BuildReport),
}

impl ActionOutcome {
    pub fn summary(&self) -> String {
        match self {
            Self::Rested => "rested".into(),
            Self::Verified(r) => format!(
                "{} open assumptions, {} stale, {} expired; {} artifacts checked",
                r.open, r.stale, r.expired, r.artifacts
            ),
            Self::Curated(r) => format!(
                "scanned {} logs, {} insights, {} promoted",
                r.logs_scanned, r.insights_found, r.promoted
            ),
            Self::Explored(r) => format!(
                "fetched {} posts, {} accepted ({} new), {} filtered",
                r.fetched, r.accepted, r.new_entries, r.filtered
            ),
            Self::Built(r) if r.already_built => format!("'{}' was already built", r.topic),
            Self::Built(r) => format!("built '{}' ({})", r.topic, r.test_summary),
        }
    }
}

pub struct ActionExecutors {
    feed: Arc<dyn FeedSource>,
    runner: Arc<dyn TestRunner>,
    scorer: RelevanceScorer,
    settings: ExecutorSettings,
}

impl ActionExecutors {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        runner: Arc<dyn TestRunner>,
        scorer: RelevanceScorer,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            feed,
            runner,
            scorer,
            settings,
        }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Run the executor for `decision`. Only EXPLORE and BUILD touch the
    /// queue; none of them touch the taste ledger.
    pub async fn execute(
        &self,
        decision: &Decision,
        queue: &mut CuriosityQueue,
        now: DateTime<Utc>,
    ) -> Result<ActionOutcome, ExecutorError> {
        match decision {
            Decision::Rest => Ok(ActionOutcome::Rested),
            Decision::Verify => self.verify(now).map(ActionOutcome::Verified),
            Decision::Curate => self.curate(now).map(ActionOutcome::Curated),
            Decision::Explore => self.explore(queue, now).await.map(ActionOutcome::Explored),
            Decision::Build(candidate) => self.build(candidate, queue).await.map(ActionOutcome::Built),
        }
    }
}
