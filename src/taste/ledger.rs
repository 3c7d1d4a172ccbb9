//! Append-only ledger of rejected ideas.
//!
//! What the agent refuses to build shapes it as much as what it builds. The
//! ledger is consulted before every BUILD so that an idea which was already
//! judged undesirable is not attempted again under a slightly different name.

use crate::error::LedgerError;
use crate::types::{RejectionKind, RejectionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use similar::{capture_diff_slices, get_diff_ratio, Algorithm};
use std::collections::BTreeMap;
use tracing::info;

/// Number of subjects reported in [`TasteFingerprint::recent`].
const RECENT_SAMPLES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasteLedger {
    records: Vec<RejectionRecord>,
}

/// Summary of what has been rejected and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TasteFingerprint {
    pub total_rejections: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_kind: BTreeMap<RejectionKind, usize>,
    pub primary_category: Option<String>,
    /// Newest first.
    pub recent: Vec<String>,
}

impl TasteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RejectionRecord] {
        &self.records
    }

    /// Append a considered rejection.
    pub fn record_rejection(
        &mut self,
        subject: &str,
        reason: &str,
        category: &str,
    ) -> Result<&RejectionRecord, LedgerError> {
        self.record_rejection_as(
            subject,
            reason,
            category,
            RejectionKind::ConsideredRejected,
            Utc::now(),
        )
    }

    /// Append a rejection with an explicit kind and timestamp.
    pub fn record_rejection_as(
        &mut self,
        subject: &str,
        reason: &str,
        category: &str,
        kind: RejectionKind,
        at: DateTime<Utc>,
    ) -> Result<&RejectionRecord, LedgerError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(LedgerError::EmptySubject);
        }

        let digest = Sha3_256::digest(
            format!("{subject}:{reason}:{category}:{}", at.to_rfc3339()).as_bytes(),
        );
        let record = RejectionRecord {
            subject: subject.to_string(),
            reason: reason.to_string(),
            category: category.to_string(),
            kind,
            fingerprint: hex::encode(&digest[..6]),
            timestamp: at,
        };

        info!("Taste: rejected '{}' ({}): {}", record.subject, category, reason);
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    /// Whether `subject` resembles anything previously rejected.
    ///
    /// A match is either containment of one normalised subject in the other,
    /// or a token-set Dice overlap of at least `threshold`.
    pub fn was_rejected(&self, subject: &str, threshold: f64) -> bool {
        let tokens = tokenize(subject);
        if tokens.is_empty() {
            return false;
        }
        let needle = tokens.join(" ");

        self.records.iter().any(|record| {
            let other = tokenize(&record.subject);
            if other.is_empty() {
                return false;
            }
            let hay = other.join(" ");
            if contains_phrase(&hay, &needle) || contains_phrase(&needle, &hay) {
                return true;
            }
            token_overlap(&tokens, &other) >= threshold
        })
    }

    pub fn fingerprint(&self) -> TasteFingerprint {
        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_kind: BTreeMap<RejectionKind, usize> = BTreeMap::new();
        for record in &self.records {
            *by_category.entry(record.category.clone()).or_default() += 1;
            *by_kind.entry(record.kind).or_default() += 1;
        }

        let primary_category = by_category
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(name, _)| name.clone());

        TasteFingerprint {
            total_rejections: self.records.len(),
            by_category,
            by_kind,
            primary_category,
            recent: self
                .records
                .iter()
                .rev()
                .take(RECENT_SAMPLES)
                .map(|r| r.subject.clone())
                .collect(),
        }
    }
}

/// Lowercase alphanumeric tokens.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Whole-token containment of `needle` inside `hay`.
fn contains_phrase(hay: &str, needle: &str) -> bool {
    format!(" {hay} ").contains(&format!(" {needle} "))
}

/// Dice coefficient of the two token sets.
///
/// Sorted, de-duplicated token lists turn the diff's longest common
/// subsequence into the set intersection, so the diff ratio is exactly
/// 2|A∩B| / (|A|+|B|).
fn token_overlap(a: &[String], b: &[String]) -> f64 {
    fn canon(tokens: &[String]) -> Vec<&str> {
        let mut t: Vec<&str> = tokens.iter().map(String::as_str).collect();
        t.sort_unstable();
        t.dedup();
        t
    }
    let (left, right) = (canon(a), canon(b));
    let ops = capture_diff_slices(Algorithm::Myers, &left, &right);
    get_diff_ratio(&ops, left.len(), right.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.6;

    #[test]
    fn empty_subject_is_refused() {
        let mut ledger = TasteLedger::new();
        assert_eq!(
            ledger.record_rejection("  ", "nope", "scope").unwrap_err(),
            LedgerError::EmptySubject
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn exact_and_case_insensitive_matches() {
        let mut ledger = TasteLedger::new();
        ledger
            .record_rejection("Memory Decay Engine", "duplicate", "scope")
            .unwrap();
        assert!(ledger.was_rejected("memory decay engine", THRESHOLD));
        assert!(ledger.was_rejected("MEMORY   DECAY ENGINE", THRESHOLD));
    }

    #[test]
    fn containment_matches_either_direction() {
        let mut ledger = TasteLedger::new();
        ledger
            .record_rejection("moltbook: Credential scanner for agents", "noise", "relevance")
            .unwrap();
        assert!(ledger.was_rejected("credential scanner", THRESHOLD));
        assert!(ledger.was_rejected(
            "A new moltbook credential scanner for agents today",
            THRESHOLD
        ));
    }

    #[test]
    fn token_overlap_threshold() {
        let mut ledger = TasteLedger::new();
        ledger
            .record_rejection("heartbeat rate limiter tool", "scope", "scope")
            .unwrap();
        // 3 shared of 4 + 4 tokens: 6/8 = 0.75
        assert!(ledger.was_rejected("rate limiter heartbeat helper", THRESHOLD));
        // 1 shared of 4 + 3 tokens: 2/7 < 0.6
        assert!(!ledger.was_rejected("json escape heartbeat", THRESHOLD));
    }

    #[test]
    fn unrelated_subject_is_not_rejected() {
        let mut ledger = TasteLedger::new();
        ledger.record_rejection("JSON escaper", "boring", "vibe").unwrap();
        assert!(!ledger.was_rejected("Assumption tracker", THRESHOLD));
        assert!(!ledger.was_rejected("", THRESHOLD));
    }

    #[test]
    fn fingerprint_summarises_history() {
        let mut ledger = TasteLedger::new();
        ledger.record_rejection("a", "r", "build_failure").unwrap();
        ledger.record_rejection("b", "r", "build_failure").unwrap();
        ledger
            .record_rejection_as("c", "r", "scope", RejectionKind::Deferred, Utc::now())
            .unwrap();

        let fp = ledger.fingerprint();
        assert_eq!(fp.total_rejections, 3);
        assert_eq!(fp.by_category["build_failure"], 2);
        assert_eq!(fp.by_kind[&RejectionKind::Deferred], 1);
        assert_eq!(fp.primary_category.as_deref(), Some("build_failure"));
        assert_eq!(fp.recent, vec!["c", "b", "a"]);
    }

    #[test]
    fn records_carry_fingerprints() {
        let mut ledger = TasteLedger::new();
        let record = ledger.record_rejection("x", "y", "z").unwrap();
        assert_eq!(record.fingerprint.len(), 12);
        assert_eq!(record.kind, RejectionKind::ConsideredRejected);
    }
}
