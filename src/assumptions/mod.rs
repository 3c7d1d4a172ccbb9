pub mod tracker;

pub use tracker::{
    Assumption, AssumptionStatus, AssumptionSummary, AssumptionTracker, ASSUMPTIONS_FILE,
};
