pub mod queue;

pub use queue::{normalize_topic, topic_id, CuriosityQueue};
