pub mod wake;

pub use wake::WakeCycle;
