//! Transport layer abstraction for store operations.

use crate::error::ClientResult;
use canopy_protocol::{Path, Precondition, Request, Response, Value, VersionToken};

/// A store transport reads nodes and writes them, optionally conditionally.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (REST over HTTP, in-process loopback, test doubles).
/// Transport failures are `Err`; a rejected precondition is a normal
/// [`WriteOutcome::Conflict`].
pub trait StoreTransport: Send + Sync {
    /// Reads the current value and version of a node.
    fn read_node(&self, path: &Path) -> ClientResult<NodeRead>;

    /// Writes a node, guarded by `precondition`.
    fn write_node(
        &self,
        path: &Path,
        op: &WriteOp,
        precondition: &Precondition,
    ) -> ClientResult<WriteOutcome>;

    /// Checks if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Closes the transport.
    fn close(&self) -> ClientResult<()>;
}

/// Result of reading a node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRead {
    /// Current value, `Value::Null` if the node does not exist.
    pub value: Value,
    /// Current version.
    pub version: VersionToken,
}

/// A write to a single node.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Replace the node's value.
    Set(Value),
    /// Delete the node.
    Remove,
}

impl WriteOp {
    /// Operation name, for messages.
    pub fn name(&self) -> &'static str {
        match self {
            WriteOp::Set(_) => "set",
            WriteOp::Remove => "remove",
        }
    }
}

/// Result of a write that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The write was applied; the node now has this version.
    Applied(VersionToken),
    /// The precondition no longer matched; nothing was written.
    Conflict(ConflictResponse),
}

/// The exchange in which the store rejected a precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictResponse {
    /// Request as sent.
    pub request: Request,
    /// Response as received.
    pub response: Response,
}
