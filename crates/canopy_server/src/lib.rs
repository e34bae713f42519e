//! # Canopy Server
//!
//! Reference in-memory tree store for Canopy.
//!
//! This crate provides:
//! - A JSON tree addressed by `Path`
//! - Entity tags derived from node contents (SHA-256)
//! - Conditional writes guarded by `if-match`
//! - Request handling for the REST mapping (`GET`, `PUT`, `DELETE`)
//!
//! # Protocol
//!
//! - Reads return the node's value and, when asked via `x-firebase-etag`,
//!   its entity tag.
//! - Writes carrying `if-match` are applied only if the tag matches the
//!   node's current tag; otherwise the response is `412` with the current
//!   value and tag.
//! - Absent nodes have the tag `null_etag`.
//!
//! The precondition check and the write happen under one lock, so racing
//! writers are serialized.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod server;
mod tree;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::StoreServer;
pub use tree::{version_of, NodeTree};
