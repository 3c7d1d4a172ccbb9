//! Clawgotchi: wake-cycle decision engine for a curious autonomous agent.
//!
//! Each wake observes health, picks exactly one action (REST, VERIFY,
//! CURATE, EXPLORE or BUILD), runs it, reflects, and persists its curiosity
//! queue, taste ledger and cycle state atomically.

pub mod agent;
pub mod assumptions;
pub mod config;
pub mod curiosity;
pub mod decision;
pub mod error;
pub mod executors;
pub mod feed;
pub mod health;
pub mod heartbeat;
pub mod memory;
pub mod runner;
pub mod scoring;
pub mod skills;
pub mod state;
pub mod taste;
pub mod types;
