//! Statement snapshot module
//!
//! The heart of the tool: capturing `pg_stat_statements` twice across a
//! sampling window and ranking the per-statement deltas. This module
//! provides:
//! - snapshot SQL construction driven by the capability matrix
//! - the in-memory delta & rank engine
//! - the run orchestrator (capture, wait, capture, diff)
//! - the result post-filter

#[allow(dead_code)]
pub mod delta;
pub mod filter;
pub mod orchestrator;
pub mod query;

pub use orchestrator::SnapshotOrchestrator;
#[allow(unused_imports)]
pub use delta::{Counters, DeltaEngine, DeltaRow, StatementSnapshotRow};
#[allow(unused_imports)]
pub use filter::filter_preamble;
