//! # Canopy Protocol
//!
//! Wire-level types shared by the Canopy client and the reference store.
//!
//! This crate provides:
//! - `Path` for validated locations in the store tree
//! - `VersionToken` for opaque entity tags
//! - `Precondition` for conditional writes
//! - HTTP-like `Request` / `Response` messages for the REST mapping
//! - JSON body encoding/decoding
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod error;
mod message;
mod path;
mod version;

pub use codec::{decode_value, encode_value};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{headers, status, Headers, Method, Precondition, Request, Response};
pub use path::{Path, MAX_DEPTH, MAX_KEY_BYTES};
pub use version::VersionToken;

/// Payload type stored at a node. `Value::Null` means the node does not exist.
pub use serde_json::Value;
