pub mod daemon;

pub use daemon::{adaptive_interval, WakeDaemon};
