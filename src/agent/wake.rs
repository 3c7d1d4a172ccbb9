//! One complete wake cycle.
//!
//! load -> observe health -> promote matured ideas -> decide -> execute ->
//! reflect -> advance the index -> flush. The queue, ledger and cycle state
//! are read once at the start and written once at the end; only a
//! persistence failure aborts the cycle, and then nothing is written.

use crate::config::ClawConfig;
use crate::decision::{decide, Decision};
use crate::error::{CycleError, ExecutorError};
use crate::executors::{ActionExecutors, ActionOutcome, ExecutorSettings};
use crate::feed::HttpFeedClient;
use crate::health::{HealthSource, WorkspaceHealth};
use crate::memory::DailyLog;
use crate::runner::{ArtifactCheckRunner, CommandTestRunner, TestRunner};
use crate::scoring::RelevanceScorer;
use crate::state::{CycleJournal, JsonFileStore, Snapshot, StateStore, WakeLock};
use crate::types::{ActionKind, CycleReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub struct WakeCycle {
    config: ClawConfig,
    store: Arc<dyn StateStore>,
    health: Arc<dyn HealthSource>,
    executors: ActionExecutors,
    daily_log: Option<DailyLog>,
    journal: Option<Arc<Mutex<CycleJournal>>>,
    lock: Option<(PathBuf, Duration)>,
}

impl WakeCycle {
    pub fn new(
        config: ClawConfig,
        store: Arc<dyn StateStore>,
        health: Arc<dyn HealthSource>,
        executors: ActionExecutors,
    ) -> Self {
        Self {
            config,
            store,
            health,
            executors,
            daily_log: None,
            journal: None,
            lock: None,
        }
    }

    /// Wire the production collaborators described by `config`.
    pub fn from_config(config: ClawConfig) -> Result<Self> {
        let state_dir = config.resolved_state_dir();
        std::fs::create_dir_all(&state_dir)
            .with_context(|| format!("Failed to create state dir {:?}", state_dir))?;

        let feed = Arc::new(HttpFeedClient::new(&config.feed.url, &config.feed.api_key));
        let runner: Arc<dyn TestRunner> = if config.build.test_command.is_empty() {
            Arc::new(ArtifactCheckRunner::new(config.resolved_artifacts_dir()))
        } else {
            Arc::new(CommandTestRunner::new(
                config.build.test_command.clone(),
                Some(config.resolved_test_workdir()),
            ))
        };
        let executors = ActionExecutors::new(
            feed,
            runner,
            RelevanceScorer::new(config.scoring.clone()),
            ExecutorSettings::from_config(&config),
        );

        let workspace = std::env::current_dir().context("Failed to read current directory")?;
        let health = Arc::new(WorkspaceHealth::new(workspace, state_dir.clone()));
        let store = Arc::new(JsonFileStore::new(state_dir));

        let journal = CycleJournal::open(&config.resolved_journal_path())?;
        let daily_log = DailyLog::new(config.resolved_memory_dir());
        let lock_path = config.resolved_lock_path();
        let stale = Duration::from_secs(config.wake.lock_stale_secs);

        Ok(Self::new(config, store, health, executors)
            .with_daily_log(daily_log)
            .with_journal(Arc::new(Mutex::new(journal)))
            .with_lock(lock_path, stale))
    }

    pub fn with_daily_log(mut self, log: DailyLog) -> Self {
        self.daily_log = Some(log);
        self
    }

    pub fn with_journal(mut self, journal: Arc<Mutex<CycleJournal>>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_lock(mut self, path: PathBuf, stale_after: Duration) -> Self {
        self.lock = Some((path, stale_after));
        self
    }

    pub fn config(&self) -> &ClawConfig {
        &self.config
    }

    pub async fn run_once(&self) -> Result<CycleReport, CycleError> {
        self.run_at(Utc::now()).await
    }

    /// Run one cycle as if the clock read `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<CycleReport, CycleError> {
        let _lock = match &self.lock {
            Some((path, stale)) => Some(WakeLock::acquire(path, *stale)?),
            None => None,
        };

        let mut snapshot = Snapshot::load(self.store.as_ref())?;
        let index = snapshot.cycle.cycle_index;

        let health = self.health.get_health_score(&snapshot.cycle).await;
        snapshot.cycle.update_health(health, now);

        let maturity = &self.config.maturity;
        let promoted = snapshot.queue.promote_matured(maturity, now);
        let mature = snapshot.queue.get_mature(maturity, now);
        let decision = decide(
            index,
            &mature,
            &snapshot.ledger,
            self.config.taste.similarity_threshold,
        );
        let chosen = decision.kind();
        info!(
            "Wake #{} (health {}): {} [{} mature, {} newly matured]",
            index,
            snapshot.cycle.health_score,
            decision.describe(),
            mature.len(),
            promoted
        );

        let result = self
            .executors
            .execute(&decision, &mut snapshot.queue, now)
            .await;

        let (recorded, summary, success) = match result {
            Ok(outcome) => {
                snapshot.cycle.last_failure = None;
                let summary = outcome.summary();
                self.reflect(now, index, chosen, &summary, insight_for(&outcome).as_deref());
                (chosen, summary, true)
            }
            Err(e) => {
                warn!("{} failed, falling back to REST: {}", chosen, e);
                if let Decision::Build(candidate) = &decision {
                    self.executors.reject_candidate(
                        candidate,
                        &e,
                        &mut snapshot.queue,
                        &mut snapshot.ledger,
                        now,
                    );
                }
                let failure = format!("{chosen}: {e}");
                snapshot.cycle.last_failure = Some(failure.clone());
                snapshot.cycle.add_error(failure);
                let summary = format!("{chosen} failed ({e}), rested");
                self.reflect(now, index, ActionKind::Rest, &summary, note_for(&decision, &e).as_deref());
                (ActionKind::Rest, summary, false)
            }
        };

        snapshot.cycle.last_action = recorded;
        snapshot.cycle.last_action_time = Some(now);
        snapshot.cycle.cycle_index = index + 1;

        snapshot.save(self.store.as_ref())?;

        let report = CycleReport {
            cycle_index: index,
            health_score: snapshot.cycle.health_score,
            chosen,
            recorded,
            description: decision.describe(),
            summary,
            success,
            finished_at: Utc::now(),
        };
        self.journal(&report).await;
        info!("Wake #{} done: {} ({})", index, recorded, report.summary);
        Ok(report)
    }

    /// Append to the daily log. Failures are logged and otherwise ignored.
    fn reflect(
        &self,
        now: DateTime<Utc>,
        index: u64,
        action: ActionKind,
        summary: &str,
        extra: Option<&str>,
    ) {
        let Some(log) = &self.daily_log else {
            return;
        };
        let mut lines = vec![format!("[cycle {index}] {action}: {summary}")];
        lines.extend(extra.map(str::to_string));
        for line in lines {
            if let Err(e) = log.append(now, &line) {
                warn!("Failed to write daily log: {}", e);
                return;
            }
        }
    }

    async fn journal(&self, report: &CycleReport) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.lock().await.append(report) {
                error!("Failed to journal wake #{}: {:#}", report.cycle_index, e);
            }
        }
    }
}

/// Curatable line for outcomes worth remembering.
fn insight_for(outcome: &ActionOutcome) -> Option<String> {
    match outcome {
        ActionOutcome::Built(r) if !r.already_built => {
            Some(format!("Key learning: built '{}'", r.topic))
        }
        ActionOutcome::Verified(r) if r.expired > 0 => Some(format!(
            "Note: {} assumptions expired without verification",
            r.expired
        )),
        _ => None,
    }
}

fn note_for(decision: &Decision, error: &ExecutorError) -> Option<String> {
    match decision {
        Decision::Build(c) => Some(format!("Remember: '{}' failed to build: {}", c.topic, error)),
        _ => None,
    }
}
