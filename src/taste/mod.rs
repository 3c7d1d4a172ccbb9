pub mod ledger;

pub use ledger::{TasteFingerprint, TasteLedger};
