//! Priority chain that maps one wake to exactly one action.
//!
//! Order (first applicable wins):
//!   1. every 3rd cycle       -> VERIFY
//!   2. every 5th cycle       -> CURATE
//!   3. every 4th cycle       -> EXPLORE
//!   4. mature, untasted idea -> BUILD
//!   5. otherwise             -> REST
//!
//! BUILD is deliberately rare: an idea must have matured and must not
//! resemble anything in the taste ledger.

use crate::taste::TasteLedger;
use crate::types::{ActionKind, CandidateIdea};
use tracing::debug;

/// The outcome of the policy for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Rest,
    Verify,
    Curate,
    Explore,
    Build(CandidateIdea),
}

impl Decision {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Rest => ActionKind::Rest,
            Self::Verify => ActionKind::Verify,
            Self::Curate => ActionKind::Curate,
            Self::Explore => ActionKind::Explore,
            Self::Build(_) => ActionKind::Build,
        }
    }

    /// One-line human description, used for logs and the daily log.
    pub fn describe(&self) -> String {
        match self {
            Self::Rest => "Resting: nothing mature to build".into(),
            Self::Verify => "Verifying assumptions".into(),
            Self::Curate => "Curating memories".into(),
            Self::Explore => "Exploring the feed for ideas".into(),
            Self::Build(c) => format!("Building: {}", c.topic),
        }
    }
}

/// Choose the action for `cycle_index`.
///
/// `mature` must already be ordered best-first (as returned by
/// `CuriosityQueue::get_mature`).
pub fn decide(
    cycle_index: u64,
    mature: &[CandidateIdea],
    ledger: &TasteLedger,
    similarity_threshold: f64,
) -> Decision {
    if cycle_index % 3 == 0 {
        return Decision::Verify;
    }
    if cycle_index % 5 == 0 {
        return Decision::Curate;
    }
    if cycle_index % 4 == 0 {
        return Decision::Explore;
    }

    let pick = mature.iter().find(|c| {
        let rejected = ledger.was_rejected(&c.topic, similarity_threshold);
        if rejected {
            debug!("Skipping '{}': resembles a past rejection", c.topic);
        }
        !rejected
    });

    match pick {
        Some(candidate) => Decision::Build(candidate.clone()),
        None => Decision::Rest,
    }
}
