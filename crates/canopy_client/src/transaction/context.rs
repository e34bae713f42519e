//! The capability handed to a transaction callback.

use super::cache::SnapshotCache;
use super::failure::TransactionFailure;
use super::snapshot::Snapshot;
use super::writer::ConditionalWriter;
use crate::error::{ClientResult, UsageError};
use crate::reference::Reference;
use crate::transport::{StoreTransport, WriteOp, WriteOutcome};
use canopy_protocol::{Path, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Where a reference stands within one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefState {
    /// Never snapshotted in this attempt.
    Unregistered,
    /// Snapshotted, no write settled since.
    Snapshotted,
    /// The last write was applied.
    Committed,
    /// The last write was rejected by the store.
    Conflicted,
}

impl RefState {
    /// Returns true if `set`/`remove` is allowed.
    pub fn can_write(&self) -> bool {
        matches!(self, RefState::Snapshotted)
    }

    /// Returns true once a write has settled.
    pub fn is_settled(&self) -> bool {
        matches!(self, RefState::Committed | RefState::Conflicted)
    }
}

impl fmt::Display for RefState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefState::Unregistered => "unregistered",
            RefState::Snapshotted => "snapshotted",
            RefState::Committed => "committed",
            RefState::Conflicted => "conflicted",
        };
        f.write_str(name)
    }
}

/// One attempt of a transaction.
///
/// Reads go through [`snapshot`](Self::snapshot), which records the version
/// each later [`set`](Self::set) or [`remove`](Self::remove) on the same
/// reference is conditioned on. Writes are sent one at a time as they are
/// called; a write that was applied stays applied even if a later one in the
/// same attempt conflicts.
pub struct Transaction<'a, T: StoreTransport + ?Sized> {
    transport: &'a T,
    attempt: u32,
    cache: SnapshotCache,
    states: HashMap<Path, RefState>,
    writes_applied: u64,
    conflicts: u64,
}

impl<'a, T: StoreTransport + ?Sized> Transaction<'a, T> {
    /// Starts attempt number `attempt` (1-based) with an empty cache.
    pub fn new(transport: &'a T, attempt: u32) -> Self {
        Self {
            transport,
            attempt,
            cache: SnapshotCache::new(),
            states: HashMap::new(),
            writes_applied: 0,
            conflicts: 0,
        }
    }

    /// Reads the reference and makes it the baseline for later writes.
    pub fn snapshot(&mut self, reference: &Reference) -> ClientResult<Snapshot> {
        let read = self.transport.read_node(reference.path())?;
        debug!(
            path = %reference,
            attempt = self.attempt,
            version = %read.version,
            "snapshot"
        );

        let snapshot = Snapshot::new(reference.clone(), read.value, read.version);
        self.cache.register(snapshot.clone());
        self.states
            .insert(reference.path().clone(), RefState::Snapshotted);
        Ok(snapshot)
    }

    /// Replaces the reference's value if it has not changed since its snapshot.
    ///
    /// # Errors
    ///
    /// - [`UsageError::NoSnapshot`] if the reference was not snapshotted in
    ///   this attempt.
    /// - [`UsageError::AlreadySettled`] if a write to the reference already
    ///   committed or conflicted since its last snapshot. Call
    ///   [`snapshot`](Self::snapshot) again before writing it a second time.
    /// - [`ClientError::TransactionFailed`](crate::ClientError::TransactionFailed)
    ///   if the store rejected the write because the node changed.
    /// - Any transport error, unchanged.
    pub fn set(&mut self, reference: &Reference, value: impl Into<Value>) -> ClientResult<()> {
        self.write(reference, WriteOp::Set(value.into()))
    }

    /// Deletes the reference if it has not changed since its snapshot.
    ///
    /// Fails like [`set`](Self::set), including [`UsageError::AlreadySettled`]
    /// for a second write without a fresh snapshot.
    pub fn remove(&mut self, reference: &Reference) -> ClientResult<()> {
        self.write(reference, WriteOp::Remove)
    }

    /// Current state of a reference in this attempt.
    pub fn state(&self, reference: &Reference) -> RefState {
        self.states
            .get(reference.path())
            .copied()
            .unwrap_or(RefState::Unregistered)
    }

    /// Latest snapshot of a reference in this attempt.
    pub fn cached(&self, reference: &Reference) -> Option<&Snapshot> {
        self.cache.get(reference.path())
    }

    /// Attempt number, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Writes applied in this attempt.
    pub fn writes_applied(&self) -> u64 {
        self.writes_applied
    }

    /// Writes rejected in this attempt.
    pub fn conflicts(&self) -> u64 {
        self.conflicts
    }

    fn write(&mut self, reference: &Reference, op: WriteOp) -> ClientResult<()> {
        let path = reference.path();
        let state = self.state(reference);
        if state.is_settled() {
            return Err(UsageError::AlreadySettled {
                operation: op.name(),
                path: path.clone(),
                state,
            }
            .into());
        }

        let expected = match self.cache.get(path) {
            Some(snapshot) => snapshot.version().clone(),
            None => {
                return Err(UsageError::NoSnapshot {
                    operation: op.name(),
                    path: path.clone(),
                }
                .into())
            }
        };

        let writer = ConditionalWriter::new(self.transport);
        match writer.write(path, &op, &expected)? {
            WriteOutcome::Applied(_) => {
                self.writes_applied += 1;
                self.states.insert(path.clone(), RefState::Committed);
                Ok(())
            }
            WriteOutcome::Conflict(conflict) => {
                self.conflicts += 1;
                self.states.insert(path.clone(), RefState::Conflicted);
                Err(TransactionFailure::new(path.clone(), expected, op, conflict).into())
            }
        }
    }
}
