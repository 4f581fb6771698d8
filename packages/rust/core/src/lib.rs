//! Core pipeline for istawatch: the update decision engine and the cycle
//! orchestrator that ties session, extraction, categorization, decision,
//! download, and metadata persistence together.

pub mod cycle;
pub mod decision;

pub use cycle::{CycleObserver, CycleReport, SilentObserver, run_update_cycle, run_watch_loop};
pub use decision::{Decision, DecisionReason, decide};
