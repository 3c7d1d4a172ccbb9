use super::ActionExecutors;
use crate::curiosity::CuriosityQueue;
use crate::error::ExecutorError;
use crate::skills::{
    accept_artifact, artifact_dir, artifact_exists, remove_artifact, write_artifact,
};
use crate::taste::TasteLedger;
use crate::types::{CandidateIdea, IdeaStatus, RejectionKind};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, warn};

/// Ledger category for candidates whose build failed.
pub const BUILD_FAILURE_CATEGORY: &str = "build_failure";

#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub candidate_id: String,
    pub topic: String,
    pub artifact: PathBuf,
    pub already_built: bool,
    pub test_summary: String,
}

impl ActionExecutors {
    /// Write the candidate's artifact and accept it only if the test run
    /// passes. Any failure removes the artifact again and is returned to
    /// the caller, which settles it with [`ActionExecutors::reject_candidate`].
    ///
    /// Only accepted artifacts short-circuit as already built. A directory
    /// left behind by an interrupted run is rewritten and tested again.
    pub(crate) async fn build(
        &self,
        candidate: &CandidateIdea,
        queue: &mut CuriosityQueue,
    ) -> Result<BuildReport, ExecutorError> {
        let artifacts_dir = &self.settings.artifacts_dir;
        let artifact = artifact_dir(artifacts_dir, candidate);

        if artifact_exists(artifacts_dir, candidate) {
            info!("'{}' already has an artifact, marking built", candidate.topic);
            queue.mark(&candidate.id, IdeaStatus::Built)?;
            return Ok(BuildReport {
                candidate_id: candidate.id.clone(),
                topic: candidate.topic.clone(),
                artifact,
                already_built: true,
                test_summary: String::new(),
            });
        }

        if let Err(e) = write_artifact(artifacts_dir, candidate) {
            remove_artifact(&artifact);
            return Err(ExecutorError::Io(e));
        }

        let timeout = self.settings.build_timeout;
        let outcome = match tokio::time::timeout(timeout, self.runner.run_tests()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                remove_artifact(&artifact);
                return Err(ExecutorError::Timeout {
                    operation: "test run",
                    secs: timeout.as_secs(),
                });
            }
        };

        if !outcome.passed {
            remove_artifact(&artifact);
            return Err(ExecutorError::BuildFailure(outcome.summary));
        }
        if let Err(e) = accept_artifact(&artifact) {
            remove_artifact(&artifact);
            return Err(ExecutorError::Io(e));
        }

        queue.mark(&candidate.id, IdeaStatus::Built)?;
        info!("Built '{}' at {:?}", candidate.topic, artifact);
        Ok(BuildReport {
            candidate_id: candidate.id.clone(),
            topic: candidate.topic.clone(),
            artifact,
            already_built: false,
            test_summary: outcome.summary,
        })
    }

    /// Settle a failed BUILD: the candidate becomes `rejected` and exactly one
    /// rejection is appended to the ledger.
    pub fn reject_candidate(
        &self,
        candidate: &CandidateIdea,
        error: &ExecutorError,
        queue: &mut CuriosityQueue,
        ledger: &mut TasteLedger,
        now: DateTime<Utc>,
    ) {
        if let Err(e) = queue.mark(&candidate.id, IdeaStatus::Rejected) {
            warn!("Could not mark '{}' rejected: {}", candidate.topic, e);
        }
        if let Err(e) = ledger.record_rejection_as(
            &candidate.topic,
            &error.to_string(),
            BUILD_FAILURE_CATEGORY,
            RejectionKind::ConsideredRejected,
            now,
        ) {
            warn!("Could not record rejection of '{}': {}", candidate.topic, e);
        }
    }
}
