pub mod relevance;

pub use relevance::{RelevanceScore, RelevanceScorer};
