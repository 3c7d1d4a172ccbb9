//! Assumptions the agent has made and not yet checked.
//!
//! VERIFY cycles look for open assumptions that have gone stale and expire
//! the ones nobody verified in time. Resolution happens from the CLI.

use crate::error::AssumptionError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ASSUMPTIONS_FILE: &str = "assumptions.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionStatus {
    Open,
    Verified,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumption {
    pub id: String,
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub status: AssumptionStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub was_correct: Option<bool>,
}

fn default_category() -> String {
    "general".into()
}

fn default_confidence() -> f64 {
    0.5
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssumptionSummary {
    pub total: usize,
    pub open: usize,
    pub verified: usize,
    pub expired: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Share of verified assumptions that turned out correct.
    pub accuracy: Option<f64>,
}

/// JSON-file backed list of assumptions.
#[derive(Debug, Clone)]
pub struct AssumptionTracker {
    path: PathBuf,
    assumptions: Vec<Assumption>,
}

impl AssumptionTracker {
    /// Load from `path`; a missing file is an empty tracker.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, AssumptionError> {
        let path = path.into();
        let assumptions = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| AssumptionError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(AssumptionError::Io { path, source }),
        };
        debug!("Loaded assumptions from {:?}", path);
        Ok(Self { path, assumptions })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn all(&self) -> &[Assumption] {
        &self.assumptions
    }

    pub fn get(&self, id: &str) -> Option<&Assumption> {
        self.assumptions.iter().find(|a| a.id == id)
    }

    /// Record a new open assumption and return its id.
    pub fn record(
        &mut self,
        content: &str,
        category: &str,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> Result<String, AssumptionError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AssumptionError::EmptyContent);
        }
        let id = ulid::Ulid::new().to_string();
        self.assumptions.push(Assumption {
            id: id.clone(),
            content: content.to_string(),
            category: category.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            status: AssumptionStatus::Open,
            timestamp: now,
            verified_at: None,
            was_correct: None,
        });
        info!("Recorded assumption {}: {}", id, content);
        Ok(id)
    }

    pub fn verify(
        &mut self,
        id: &str,
        correct: bool,
        now: DateTime<Utc>,
    ) -> Result<(), AssumptionError> {
        let assumption = self
            .assumptions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AssumptionError::NotFound(id.to_string()))?;
        if assumption.status == AssumptionStatus::Verified {
            return Err(AssumptionError::AlreadyVerified(id.to_string()));
        }
        assumption.status = AssumptionStatus::Verified;
        assumption.was_correct = Some(correct);
        assumption.verified_at = Some(now);
        Ok(())
    }

    /// Open assumptions older than `days`.
    pub fn get_stale(&self, days: i64, now: DateTime<Utc>) -> Vec<&Assumption> {
        let cutoff = now - Duration::days(days);
        self.assumptions
            .iter()
            .filter(|a| a.status == AssumptionStatus::Open && a.timestamp < cutoff)
            .collect()
    }

    /// Expire open assumptions older than `days`; returns how many changed.
    pub fn expire_old(&mut self, days: i64, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(days);
        let mut expired = 0;
        for a in &mut self.assumptions {
            if a.status == AssumptionStatus::Open && a.timestamp < cutoff {
                a.status = AssumptionStatus::Expired;
                expired += 1;
            }
        }
        expired
    }

    pub fn summary(&self) -> AssumptionSummary {
        let mut s = AssumptionSummary {
            total: self.assumptions.len(),
            ..Default::default()
        };
        for a in &self.assumptions {
            match a.status {
                AssumptionStatus::Open => s.open += 1,
                AssumptionStatus::Expired => s.expired += 1,
                AssumptionStatus::Verified => {
                    s.verified += 1;
                    if a.was_correct == Some(true) {
                        s.correct += 1;
                    } else {
                        s.incorrect += 1;
                    }
                }
            }
        }
        if s.verified > 0 {
            s.accuracy = Some(s.correct as f64 / s.verified as f64);
        }
        s
    }

    /// Write the whole list through a temp file and rename.
    pub fn save(&self) -> Result<(), AssumptionError> {
        let io = |source| AssumptionError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let json = serde_json::to_string_pretty(&self.assumptions).map_err(|source| {
            AssumptionError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io)?;
        fs::rename(&tmp, &self.path).map_err(io)?;
        Ok(())
    }
}
