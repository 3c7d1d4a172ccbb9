//! Error taxonomy for the wake cycle.
//!
//! Only [`CycleError`] ever escapes a full cycle, and it only carries
//! persistence or lock problems. Everything else is absorbed by the
//! component that can act on it.

use std::path::PathBuf;
use thiserror::Error;

/// A post could not be scored. Always recovered locally as noise.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoringError {
    #[error("post has neither title nor body")]
    EmptyPost,

    #[error("post contains NUL characters")]
    InvalidCharacters,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("no curiosity entry with id {0}")]
    NotFound(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("rejection subject must not be empty")]
    EmptySubject,
}

#[derive(Debug, Error)]
pub enum AssumptionError {
    #[error("assumption content must not be empty")]
    EmptyContent,

    #[error("no assumption with id {0}")]
    NotFound(String),

    #[error("assumption {0} is already verified")]
    AlreadyVerified(String),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt assumptions file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

/// Raised by an action executor. The cycle converts it into a REST fallback.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("build failed: {0}")]
    BuildFailure(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("no candidate supplied for BUILD")]
    MissingCandidate,

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("assumption error: {0}")]
    Assumption(#[from] AssumptionError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt state in {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("another wake is in progress (lock held at {})", .0.display())]
    WakeInProgress(PathBuf),
}
