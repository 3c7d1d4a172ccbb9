use super::ActionExecutors;
use crate::error::ExecutorError;
use crate::memory::{CurationReport, DailyLog, MemoryCurator};
use chrono::{DateTime, Utc};

impl ActionExecutors {
    /// Promote tagged insights from recent daily logs into curated memory.
    pub(crate) fn curate(&self, now: DateTime<Utc>) -> Result<CurationReport, ExecutorError> {
        let settings = &self.settings;
        let curator = MemoryCurator::new(DailyLog::new(&settings.memory_dir));
        Ok(curator.curate(
            settings.curate.lookback_days,
            settings.curate.max_promotions,
            now,
        )?)
    }
}
