pub mod schema;

pub use schema::{
    BuildConfig, CategoryConfig, ClawConfig, CurateConfig, FeedConfig, Keyword, MaturityConfig,
    ScoringConfig, TasteConfig, VerifyConfig, WakeConfig,
};

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};

/// Name of the config file inside the home directory.
pub const CONFIG_FILE: &str = "clawgotchi.toml";

/// Default home directory (~/.clawgotchi).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".clawgotchi"))
        .unwrap_or_else(|| PathBuf::from(".clawgotchi"))
}

/// Load `<home>/clawgotchi.toml` (defaults when absent), rebase `~/.clawgotchi`
/// paths onto `home` and reject values a wake cycle cannot run with.
pub fn load_config(home: &Path) -> Result<ClawConfig> {
    let path = home.join(CONFIG_FILE);
    let config = if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str::<ClawConfig>(&contents)
            .with_context(|| format!("Failed to parse {} (TOML)", path.display()))?
    } else {
        ClawConfig::default()
    };
    let config = config.with_home(home);
    validate(&config)?;
    Ok(config)
}

/// Thresholds must be fractions and every timeout non-zero.
pub fn validate(config: &ClawConfig) -> Result<()> {
    let fraction = |name: &str, v: f64| {
        if (0.0..=1.0).contains(&v) {
            Ok(())
        } else {
            Err(anyhow!("{name} must be within 0..=1, got {v}"))
        }
    };
    fraction("scoring.min_score", config.scoring.min_score)?;
    fraction("taste.similarity_threshold", config.taste.similarity_threshold)?;

    if config.scoring.min_categories == 0 {
        bail!("scoring.min_categories must be at least 1");
    }
    for (name, secs) in [
        ("wake.interval_secs", config.wake.interval_secs),
        ("wake.explore_timeout_secs", config.wake.explore_timeout_secs),
        ("wake.build_timeout_secs", config.wake.build_timeout_secs),
    ] {
        if secs == 0 {
            bail!("{name} must be greater than zero");
        }
    }
    Ok(())
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &ClawConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}

/// Write a default config into `home` and create the state, memory and
/// artifact directories. Returns `None` when a config exists and `force`
/// is not set.
pub fn init_home(home: &Path, force: bool) -> Result<Option<PathBuf>> {
    let path = home.join(CONFIG_FILE);
    if path.exists() && !force {
        return Ok(None);
    }

    let config = ClawConfig::default();
    save_config(&config, &path)?;

    let config = config.with_home(home);
    for dir in [
        config.resolved_state_dir(),
        config.resolved_memory_dir(),
        config.resolved_artifacts_dir(),
    ] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(Some(path))
}
