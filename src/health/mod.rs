pub mod monitor;

pub use monitor::{FixedHealth, HealthSource, WorkspaceHealth};
