//! Promotes tagged insights from daily logs into `MEMORY.md`.

use super::daily_log::DailyLog;
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

pub const CURATED_FILE: &str = "MEMORY.md";
const CURATED_HEADER: &str = "# Curated Insights\n\n";
const INSIGHT_TAGS: [&str; 5] = ["important", "key learning", "note", "remember", "insight"];
const MIN_INSIGHT_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    pub text: String,
    /// Log file name the insight came from.
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurationReport {
    pub logs_scanned: usize,
    pub insights_found: usize,
    pub promoted: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryCurator {
    log: DailyLog,
}

impl MemoryCurator {
    pub fn new(log: DailyLog) -> Self {
        Self { log }
    }

    pub fn curated_path(&self) -> PathBuf {
        self.log.dir().join(CURATED_FILE)
    }

    /// Daily logs from the last `days` days that exist, newest first.
    fn recent_logs(&self, days: i64, now: DateTime<Utc>) -> Vec<PathBuf> {
        (0..days)
            .map(|i| self.log.path_for((now - Duration::days(i)).date_naive()))
            .filter(|p| p.is_file())
            .collect()
    }

    pub fn extract_insights(&self, days: i64, now: DateTime<Utc>) -> io::Result<(usize, Vec<Insight>)> {
        let logs = self.recent_logs(days, now);
        let mut insights = Vec::new();
        for path in &logs {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            for line in fs::read_to_string(path)?.lines() {
                if let Some(text) = parse_insight(line) {
                    insights.push(Insight {
                        text,
                        source: source.clone(),
                    });
                }
            }
        }
        Ok((logs.len(), insights))
    }

    /// Promote up to `max` insights not already in `MEMORY.md`.
    pub fn curate(&self, days: i64, max: usize, now: DateTime<Utc>) -> io::Result<CurationReport> {
        let (logs_scanned, insights) = self.extract_insights(days, now)?;
        let path = self.curated_path();
        let mut curated = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => CURATED_HEADER.to_string(),
            Err(e) => return Err(e),
        };

        let mut promoted = 0;
        for insight in &insights {
            if promoted >= max {
                break;
            }
            if curated.contains(&insight.text) {
                debug!("Already curated: {}", insight.text);
                continue;
            }
            curated.push_str(&format!(
                "- **{}** [{}]: {}\n",
                now.format("%Y-%m-%d"),
                insight.source,
                insight.text
            ));
            promoted += 1;
        }

        if promoted > 0 {
            fs::create_dir_all(self.log.dir())?;
            fs::write(&path, curated)?;
            info!("Promoted {} insights to {:?}", promoted, path);
        }

        Ok(CurationReport {
            logs_scanned,
            insights_found: insights.len(),
            promoted,
        })
    }
}

/// Text of a line tagged `Important:`, `Key learning:`, `Note:`,
/// `Remember:` or `Insight:` (case-insensitive, optionally bulleted and
/// time-stamped).
fn parse_insight(line: &str) -> Option<String> {
    let lower = line.to_lowercase();
    INSIGHT_TAGS.iter().find_map(|tag| {
        let needle = format!("{tag}:");
        let at = lower.find(&needle)?;
        // Tag must start the line content, after bullets and a timestamp.
        let prefix = &lower[..at];
        let prefix_ok = prefix
            .chars()
            .all(|c| c.is_whitespace() || c == '-' || c == '*' || c.is_ascii_digit() || c == ':');
        if !prefix_ok {
            return None;
        }
        let text = line.get(at + needle.len()..)?.trim();
        (text.len() >= MIN_INSIGHT_LEN).then(|| text.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn recognises_tagged_lines() {
        assert_eq!(
            parse_insight("- 10:11:12 Key learning: small tools win").as_deref(),
            Some("small tools win")
        );
        assert_eq!(parse_insight("* IMPORTANT: back up state").as_deref(), Some("back up state"));
        assert_eq!(parse_insight("Remember: hi"), None);
        assert_eq!(parse_insight("- [cycle 3] VERIFY: note: nothing"), None);
        assert_eq!(parse_insight("plain line"), None);
    }

    #[test]
    fn promotes_new_insights_once() {
        let dir = TempDir::new().unwrap();
        let log = DailyLog::new(dir.path());
        let now = Utc::now();
        log.append(now - Duration::days(1), "Insight: rejection shapes taste").unwrap();
        log.append(now, "Note: feed was quiet today").unwrap();
        log.append(now, "Important: keep the queue small").unwrap();
        log.append(now - Duration::days(30), "Insight: too old to matter").unwrap();

        let curator = MemoryCurator::new(log);
        let report = curator.curate(7, 2, now).unwrap();
        assert_eq!(report.logs_scanned, 2);
        assert_eq!(report.insights_found, 3);
        assert_eq!(report.promoted, 2);

        let again = curator.curate(7, 5, now).unwrap();
        assert_eq!(again.promoted, 1);
        assert_eq!(curator.curate(7, 5, now).unwrap().promoted, 0);

        let curated = fs::read_to_string(curator.curated_path()).unwrap();
        assert!(curated.starts_with("# Curated Insights"));
        assert!(!curated.contains("too old"));
    }
}
