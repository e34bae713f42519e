//! Conflict diagnostics.

use crate::transport::{ConflictResponse, WriteOp};
use canopy_protocol::{Path, Request, Response, Value, VersionToken};
use thiserror::Error;

/// A conditional write rejected because the node changed after it was read.
///
/// Carries the exchange with the store as it happened, so the caller can
/// inspect what was sent and what the store holds now.
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "transaction failed: {} on {path} expected version {precondition}, store answered {}",
    .operation.name(),
    .response.status
)]
pub struct TransactionFailure {
    path: Path,
    precondition: VersionToken,
    operation: WriteOp,
    request: Request,
    response: Response,
}

impl TransactionFailure {
    /// Creates a failure from a rejected write.
    pub fn new(
        path: Path,
        precondition: VersionToken,
        operation: WriteOp,
        conflict: ConflictResponse,
    ) -> Self {
        Self {
            path,
            precondition,
            operation,
            request: conflict.request,
            response: conflict.response,
        }
    }

    /// Path whose precondition was violated.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Version the write expected.
    pub fn precondition(&self) -> &VersionToken {
        &self.precondition
    }

    /// The rejected operation.
    pub fn operation(&self) -> &WriteOp {
        &self.operation
    }

    /// Request as sent.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Conflicting response as received.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// The store's current value, if the response carried a decodable body.
    pub fn current_value(&self) -> Option<Value> {
        if self.response.body.is_empty() {
            return None;
        }
        self.response.body_json().ok()
    }

    /// The store's current version, if the response carried one.
    pub fn current_version(&self) -> Option<VersionToken> {
        self.response.etag()
    }
}
