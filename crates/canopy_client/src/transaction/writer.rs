//! Conditional writes against a single path.

use crate::error::ClientResult;
use crate::transport::{StoreTransport, WriteOp, WriteOutcome};
use canopy_protocol::{Path, Precondition, VersionToken};
use tracing::{debug, warn};

/// Issues one `if-match` guarded write per call.
pub struct ConditionalWriter<'a, T: StoreTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: StoreTransport + ?Sized> ConditionalWriter<'a, T> {
    /// Creates a writer over a transport.
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Writes `op` to `path` if the node is still at `expected`.
    ///
    /// A rejected precondition is `Ok(WriteOutcome::Conflict(..))`; only
    /// failures to complete the exchange are errors.
    pub fn write(
        &self,
        path: &Path,
        op: &WriteOp,
        expected: &VersionToken,
    ) -> ClientResult<WriteOutcome> {
        let precondition = Precondition::Matches(expected.clone());
        let outcome = self.transport.write_node(path, op, &precondition)?;

        match &outcome {
            WriteOutcome::Applied(version) => {
                debug!(path = %path, op = op.name(), expected = %expected, version = %version, "conditional write applied");
            }
            WriteOutcome::Conflict(conflict) => {
                warn!(
                    path = %path,
                    op = op.name(),
                    expected = %expected,
                    status = conflict.response.status,
                    "conditional write rejected"
                );
            }
        }

        Ok(outcome)
    }
}
