//! Opaque version tokens (entity tags).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity tag assigned by the store to a node's current value.
///
/// Tokens are only ever compared for equality. Two reads returning the same
/// token saw the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Token the store reports for a node that does not exist.
    pub const NULL: &'static str = "null_etag";

    /// Creates a token from its wire form.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token of an absent node.
    pub fn null() -> Self {
        Self(Self::NULL.to_string())
    }

    /// Returns true if this is the absent-node token.
    pub fn is_null(&self) -> bool {
        self.0 == Self::NULL
    }

    /// Returns the wire form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VersionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for VersionToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}
