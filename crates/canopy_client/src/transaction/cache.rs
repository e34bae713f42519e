//! Per-attempt snapshot registry.

use super::snapshot::Snapshot;
use canopy_protocol::Path;
use std::collections::HashMap;

/// Most recent snapshot per path, scoped to one transaction attempt.
///
/// Registering a path again replaces its entry: the last read is the
/// baseline for the next conditional write.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: HashMap<Path, Snapshot>,
}

impl SnapshotCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a snapshot, returning the one it replaced.
    pub fn register(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        self.entries.insert(snapshot.path().clone(), snapshot)
    }

    /// Latest snapshot for `path`.
    pub fn get(&self, path: &Path) -> Option<&Snapshot> {
        self.entries.get(path)
    }

    /// Returns true if `path` has been snapshotted.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
