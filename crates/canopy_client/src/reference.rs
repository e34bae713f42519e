//! Node references.

use crate::error::ClientResult;
use canopy_protocol::Path;
use std::fmt;

/// Identifies one node of the store by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    path: Path,
}

impl Reference {
    /// Parses a slash-separated path.
    pub fn new(path: &str) -> ClientResult<Self> {
        Ok(Self {
            path: Path::parse(path)?,
        })
    }

    /// The root node.
    pub fn root() -> Self {
        Self::default()
    }

    /// Path of the node.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last path segment, `None` for the root.
    pub fn key(&self) -> Option<&str> {
        self.path.key()
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<Reference> {
        self.path.parent().map(Reference::from)
    }

    /// Node below this one; `relative` may contain several segments.
    pub fn child(&self, relative: &str) -> ClientResult<Reference> {
        Ok(Self {
            path: self.path.child(relative)?,
        })
    }
}

impl From<Path> for Reference {
    fn from(path: Path) -> Self {
        Self { path }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.path, f)
    }
}
