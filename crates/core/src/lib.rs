#![deny(missing_docs)]
//! Cosync availability / retrieval core.
//!
//! For a given replicated object this crate tracks whether the local node
//! has content, and if not, drives the multi-peer retrieval protocol to
//! obtain it:
//!
//! - [CoValueState] is the per-object availability state machine with a
//!   single-resolution accessor for waiters.
//! - [CoValueLoader] is the retrieval orchestrator that decides which
//!   peers to query, how many times, and when to give up or announce.
//! - [MemMetricsSink] is an in-memory sink for the availability gauge.

mod covalue_state;
pub use covalue_state::*;

mod loader;
pub use loader::*;

mod mem_metrics;
pub use mem_metrics::*;
