//! Observed node state.

use crate::reference::Reference;
use canopy_protocol::{Path, Value, VersionToken};

/// The value and version of a reference at the moment it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    reference: Reference,
    value: Value,
    version: VersionToken,
}

impl Snapshot {
    /// Creates a snapshot.
    pub fn new(reference: Reference, value: Value, version: VersionToken) -> Self {
        Self {
            reference,
            value,
            version,
        }
    }

    /// The reference that was read.
    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    /// Path of the reference.
    pub fn path(&self) -> &Path {
        self.reference.path()
    }

    /// Value at read time, `Value::Null` if absent.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Version at read time.
    pub fn version(&self) -> &VersionToken {
        &self.version
    }

    /// Returns true if the node existed.
    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }

    /// Consumes the snapshot, returning its value.
    pub fn into_value(self) -> Value {
        self.value
    }
}
