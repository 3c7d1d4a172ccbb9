pub mod curation;
pub mod daily_log;

pub use curation::{CurationReport, Insight, MemoryCurator, CURATED_FILE};
pub use daily_log::DailyLog;
