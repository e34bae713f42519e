//! # Canopy Client
//!
//! Client for a remote tree store with optimistic transactions.
//!
//! This crate provides:
//! - `Database`: plain reads and unconditional writes
//! - `Transaction`: read-then-conditionally-write against one or more nodes
//! - `StoreTransport`: the seam between the client and the network
//! - `HttpTransport`: the REST mapping over any [`HttpClient`]
//!
//! # Transactions
//!
//! A transaction never locks anything on the store. Each `snapshot` records
//! the entity tag of a node, and each following `set` or `remove` on that node
//! is sent with `if-match` set to that tag. If another writer got there first
//! the store refuses the write and the call returns
//! [`ClientError::TransactionFailed`] with the full exchange attached.
//!
//! Writes in one transaction are independent: a conflict on one node does not
//! undo writes already applied to others.
//!
//! ```text
//! Database ──> TransactionRunner ──> Transaction ──> StoreTransport ──> HttpClient
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod database;
mod error;
mod http;
mod reference;
pub mod transaction;
mod transport;

pub use config::{ClientConfig, RetryConfig};
pub use database::Database;
pub use error::{ClientError, ClientResult, UsageError};
pub use http::{HttpClient, HttpTransport, LoopbackClient, LoopbackServer};
pub use reference::Reference;
pub use transaction::{
    RefState, Snapshot, Transaction, TransactionFailure, TransactionStats,
};
pub use transport::{ConflictResponse, NodeRead, StoreTransport, WriteOp, WriteOutcome};
