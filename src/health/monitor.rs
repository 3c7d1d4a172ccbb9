//! Health probes.
//!
//! Health is a read-only 0..=100 input to each cycle. It is logged, kept in
//! the cycle history and used by the daemon to stretch its interval, but it
//! never changes which action a cycle picks.

use crate::types::CycleState;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

const DIRTY_TREE_PENALTY: i64 = 5;
const GIT_UNAVAILABLE_PENALTY: i64 = 10;
const LAST_FAILURE_PENALTY: i64 = 10;
const PER_ERROR_PENALTY: i64 = 2;
const MAX_ERROR_PENALTY: i64 = 20;
const UNWRITABLE_STATE_PENALTY: i64 = 30;

#[async_trait]
pub trait HealthSource: Send + Sync {
    /// Current health in `0..=100`. `cycle` is the last persisted state.
    async fn get_health_score(&self, cycle: &CycleState) -> i64;
}

/// Probe of the agent's working environment.
#[derive(Debug, Clone)]
pub struct WorkspaceHealth {
    workspace: PathBuf,
    state_dir: PathBuf,
}

impl WorkspaceHealth {
    pub fn new(workspace: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            state_dir: state_dir.into(),
        }
    }

    async fn git_penalty(&self) -> i64 {
        let output = match Command::new("git")
            .args(["status", "--porcelain"])
            .current_dir(&self.workspace)
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!("git status failed: {}", e);
                return GIT_UNAVAILABLE_PENALTY;
            }
        };

        if !output.status.success() {
            debug!("{:?} is not a git repository", self.workspace);
            return 0;
        }
        if String::from_utf8_lossy(&output.stdout).trim().is_empty() {
            0
        } else {
            debug!("Workspace tree is dirty");
            DIRTY_TREE_PENALTY
        }
    }

    async fn state_dir_writable(&self) -> bool {
        let probe = self.state_dir.join(".health_probe");
        let ok = match tokio::fs::create_dir_all(&self.state_dir).await {
            Ok(()) => tokio::fs::write(&probe, b"ok").await.is_ok(),
            Err(_) => false,
        };
        let _ = tokio::fs::remove_file(&probe).await;
        ok
    }
}

#[async_trait]
impl HealthSource for WorkspaceHealth {
    async fn get_health_score(&self, cycle: &CycleState) -> i64 {
        let mut score = 100;
        score -= self.git_penalty().await;
        score -= error_penalty(cycle);
        if !self.state_dir_writable().await {
            warn!("State directory {:?} is not writable", self.state_dir);
            score -= UNWRITABLE_STATE_PENALTY;
        }
        score.clamp(0, 100)
    }
}

fn error_penalty(cycle: &CycleState) -> i64 {
    let mut penalty = (cycle.errors.len() as i64 * PER_ERROR_PENALTY).min(MAX_ERROR_PENALTY);
    if cycle.last_failure.is_some() {
        penalty += LAST_FAILURE_PENALTY;
    }
    penalty
}

/// Always reports the same score.
#[derive(Debug, Clone, Copy)]
pub struct FixedHealth(pub i64);

#[async_trait]
impl HealthSource for FixedHealth {
    async fn get_health_score(&self, _cycle: &CycleState) -> i64 {
        self.0
    }
}
