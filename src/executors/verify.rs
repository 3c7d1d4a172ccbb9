use super::ActionExecutors;
use crate::assumptions::AssumptionTracker;
use crate::error::ExecutorError;
use crate::skills::load_skills;
use chrono::{DateTime, Utc};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Still open after expiry.
    pub open: usize,
    /// Open assumptions past the staleness age, counted before expiry.
    pub stale: usize,
    /// Expired by this run.
    pub expired: usize,
    /// Artifacts that still parse.
    pub artifacts: usize,
}

impl ActionExecutors {
    /// Re-check assumptions and built artifacts. Never touches the queue or
    /// the ledger.
    pub(crate) fn verify(&self, now: DateTime<Utc>) -> Result<VerifyReport, ExecutorError> {
        let settings = &self.settings;
        let mut tracker = AssumptionTracker::load(&settings.assumptions_path)?;

        let stale = tracker.get_stale(settings.verify.stale_after_days, now).len();
        let expired = tracker.expire_old(settings.verify.expire_after_days, now);
        if expired > 0 {
            tracker.save()?;
        }

        let artifacts = load_skills(&settings.artifacts_dir)
            .map_err(|e| ExecutorError::Other(format!("artifact check failed: {e:#}")))?
            .len();

        let report = VerifyReport {
            open: tracker.summary().open,
            stale,
            expired,
            artifacts,
        };
        info!(
            "Verified: {} open, {} stale, {} expired assumptions",
            report.open, report.stale, report.expired
        );
        Ok(report)
    }
}
