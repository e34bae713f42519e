//! Optimistic transactions.
//!
//! A transaction attempt reads references with [`Transaction::snapshot`] and
//! writes them back with [`Transaction::set`] or [`Transaction::remove`]. Each
//! write is conditioned on the version seen by the latest snapshot of the same
//! reference, so it only lands if nobody else changed the node in between.
//!
//! ```text
//! TransactionRunner ──> Transaction ──> SnapshotCache      (reads)
//!                                  └──> ConditionalWriter  (writes)
//! ```

mod cache;
mod context;
mod failure;
mod runner;
mod snapshot;
mod writer;

pub use cache::SnapshotCache;
pub use context::{RefState, Transaction};
pub use failure::TransactionFailure;
pub use runner::{TransactionRunner, TransactionStats};
pub use snapshot::Snapshot;
pub use writer::ConditionalWriter;
