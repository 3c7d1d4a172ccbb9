pub mod journal;
pub mod lock;
pub mod schema;
pub mod store;

pub use journal::{CycleJournal, JournalEntry};
pub use lock::WakeLock;
pub use store::{JsonFileStore, MemoryStore, Snapshot, StateStore};
