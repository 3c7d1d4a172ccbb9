pub mod policy;

pub use policy::{decide, Decision};
