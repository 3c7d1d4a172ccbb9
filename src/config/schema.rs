//! Configuration schema for clawgotchi.toml.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClawConfig {
    /// Human-readable pet name.
    pub name: String,

    /// Directory holding state.json (queue, ledger and cycle state).
    pub state_dir: String,

    /// Directory holding daily logs, MEMORY.md and assumptions.json.
    pub memory_dir: String,

    /// Directory BUILD writes artifacts into.
    pub artifacts_dir: String,

    /// Path to the SQLite cycle journal.
    pub journal_path: String,

    /// Lock file guarding against overlapping wakes.
    pub lock_path: String,

    /// Log level (debug, info, warn, error).
    pub log_level: String,

    pub wake: WakeConfig,
    pub feed: FeedConfig,
    pub scoring: ScoringConfig,
    pub maturity: MaturityConfig,
    pub taste: TasteConfig,
    pub build: BuildConfig,
    pub verify: VerifyConfig,
    pub curate: CurateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    /// Base interval between wakes in daemon mode.
    pub interval_secs: u64,
    /// Upper bound on the EXPLORE feed fetch.
    pub explore_timeout_secs: u64,
    /// Upper bound on the BUILD test run.
    pub build_timeout_secs: u64,
    /// A lock file older than this is treated as abandoned.
    pub lock_stale_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// JSON feed endpoint. Empty disables EXPLORE fetching.
    pub url: String,
    /// Optional bearer token.
    pub api_key: String,
    /// Posts requested per EXPLORE.
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub phrase: String,
    #[serde(default = "default_keyword_weight")]
    pub weight: f64,
}

fn default_keyword_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Contribution of this category to the normalised score.
    pub weight: f64,
    /// Markers that flag a post as noise when this category is in play.
    pub noise_signals: Vec<String>,
    pub keywords: Vec<Keyword>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            weight: 1.0,
            keywords: Vec::new(),
            noise_signals: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Minimum score for queue admission.
    pub min_score: f64,
    /// Minimum number of matched categories for queue admission.
    pub min_categories: usize,
    /// Multiplier applied to keyword hits found in the title.
    pub title_boost: f64,
    /// Raw keyword weight at which a category saturates to strength 1.0.
    pub saturation: f64,
    /// Noise markers independent of any category.
    pub noise_signals: Vec<String>,
    pub categories: BTreeMap<String, CategoryConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaturityConfig {
    pub min_seen: u32,
    pub min_age_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasteConfig {
    /// Token-overlap ratio at or above which a subject counts as rejected.
    pub similarity_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// argv of the external test command. Empty uses the artifact check.
    pub test_command: Vec<String>,
    /// Working directory for `test_command`. Empty uses `artifacts_dir`.
    pub test_workdir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub stale_after_days: i64,
    pub expire_after_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurateConfig {
    pub lookback_days: i64,
    pub max_promotions: usize,
}

impl Default for ClawConfig {
    fn default() -> Self {
        Self {
            name: "clawgotchi".into(),
            state_dir: "~/.clawgotchi/state".into(),
            memory_dir: "~/.clawgotchi/memory".into(),
            artifacts_dir: "~/.clawgotchi/skills".into(),
            journal_path: "~/.clawgotchi/journal.db".into(),
            lock_path: "~/.clawgotchi/wake.lock".into(),
            log_level: "info".into(),
            wake: WakeConfig::default(),
            feed: FeedConfig::default(),
            scoring: ScoringConfig::default(),
            maturity: MaturityConfig::default(),
            taste: TasteConfig::default(),
            build: BuildConfig::default(),
            verify: VerifyConfig::default(),
            curate: CurateConfig::default(),
        }
    }
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15 * 60,
            explore_timeout_secs: 10,
            build_timeout_secs: 120,
            lock_stale_secs: 60 * 60,
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            limit: 50,
        }
    }
}

impl Default for MaturityConfig {
    fn default() -> Self {
        Self {
            min_seen: 2,
            min_age_hours: 12.0,
        }
    }
}

impl Default for TasteConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.6,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            test_command: Vec::new(),
            test_workdir: String::new(),
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            stale_after_days: 7,
            expire_after_days: 30,
        }
    }
}

impl Default for CurateConfig {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            max_promotions: 3,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_score: 0.15,
            min_categories: 2,
            title_boost: 1.5,
            saturation: 3.0,
            noise_signals: [
                "airdrop",
                "subscribe",
                "giveaway",
                "nft mint",
                "free sol",
                "buy now",
                "limited time",
                "act fast",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            categories: default_categories(),
        }
    }
}

fn category(weight: f64, keywords: &[&str], noise: &[&str]) -> CategoryConfig {
    CategoryConfig {
        weight,
        noise_signals: noise.iter().map(|s| s.to_string()).collect(),
        keywords: keywords
            .iter()
            .map(|k| Keyword {
                phrase: k.to_string(),
                weight: 1.0,
            })
            .collect(),
    }
}

/// The five built-in topic categories.
fn default_categories() -> BTreeMap<String, CategoryConfig> {
    let mut map = BTreeMap::new();
    map.insert(
        "memory_systems".into(),
        category(
            3.0,
            &["memory", "forget", "decay", "archive", "curate", "retention"],
            &["chapter 1", "once upon"],
        ),
    );
    map.insert(
        "self_awareness".into(),
        category(
            3.0,
            &["assumption", "belief", "verify", "confidence", "metacognit"],
            &["fiction"],
        ),
    );
    map.insert(
        "identity".into(),
        category(
            2.0,
            &["taste", "rejection", "identity", "fingerprint", "persona"],
            &[],
        ),
    );
    map.insert(
        "agent_operations".into(),
        category(
            2.0,
            &["autonomous", "wake", "cycle", "heartbeat", "health", "monitor"],
            &[],
        ),
    );
    map.insert(
        "safety".into(),
        category(
            2.0,
            &["injection", "sanitiz", "redact", "sensitive", "credential"],
            &["token sale"],
        ),
    );
    map
}

impl ClawConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).into_owned())
    }

    pub fn resolved_state_dir(&self) -> PathBuf {
        self.resolve_path(&self.state_dir)
    }

    pub fn resolved_memory_dir(&self) -> PathBuf {
        self.resolve_path(&self.memory_dir)
    }

    pub fn resolved_artifacts_dir(&self) -> PathBuf {
        self.resolve_path(&self.artifacts_dir)
    }

    pub fn resolved_journal_path(&self) -> PathBuf {
        self.resolve_path(&self.journal_path)
    }

    pub fn resolved_lock_path(&self) -> PathBuf {
        self.resolve_path(&self.lock_path)
    }

    /// Working directory for the external test command.
    pub fn resolved_test_workdir(&self) -> PathBuf {
        if self.build.test_workdir.is_empty() {
            self.resolved_artifacts_dir()
        } else {
            self.resolve_path(&self.build.test_workdir)
        }
    }

    /// Rebase every `~/.clawgotchi` path onto a different home directory.
    pub fn with_home(mut self, home: &std::path::Path) -> Self {
        let home = home.display().to_string();
        for path in [
            &mut self.state_dir,
            &mut self.memory_dir,
            &mut self.artifacts_dir,
            &mut self.journal_path,
            &mut self.lock_path,
        ] {
            if let Some(rest) = path.strip_prefix("~/.clawgotchi") {
                *path = format!("{}{}", home, rest);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let cfg = ClawConfig::default();
        assert_eq!(cfg.scoring.min_score, 0.15);
        assert_eq!(cfg.scoring.min_categories, 2);
        assert_eq!(cfg.maturity.min_seen, 2);
        assert_eq!(cfg.maturity.min_age_hours, 12.0);
        assert_eq!(cfg.taste.similarity_threshold, 0.6);
        assert_eq!(cfg.scoring.categories.len(), 5);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: ClawConfig = toml::from_str(
            r#"
            name = "pip"

            [wake]
            interval_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(cfg.name, "pip");
        assert_eq!(cfg.wake.interval_secs, 60);
        assert_eq!(cfg.wake.build_timeout_secs, 120);
        assert_eq!(cfg.feed.limit, 50);
    }

    #[test]
    fn with_home_rebases_default_paths() {
        let cfg = ClawConfig::default().with_home(std::path::Path::new("/tmp/pet"));
        assert_eq!(cfg.state_dir, "/tmp/pet/state");
        assert_eq!(cfg.lock_path, "/tmp/pet/wake.lock");
    }
}
