//! In-memory JSON tree.

use canopy_protocol::{Path, Value, VersionToken};
use serde_json::Map;
use sha2::{Digest, Sha256};

/// Computes the entity tag of a node value.
///
/// Absent nodes (`null`) get [`VersionToken::NULL`]; everything else gets
/// the hex SHA-256 of its JSON text. Object keys serialize in sorted order, so
/// equal values always produce equal tags.
pub fn version_of(value: &Value) -> VersionToken {
    if value.is_null() {
        return VersionToken::null();
    }

    let digest = Sha256::digest(value.to_string().as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    VersionToken::new(hex)
}

/// The store's data: one JSON document addressed by path.
///
/// Nulls are never stored. Writing `null` deletes, and parents left empty
/// by a deletion disappear as well.
#[derive(Debug, Clone, Default)]
pub struct NodeTree {
    root: Value,
}

impl NodeTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value at `path`, `Value::Null` if absent.
    pub fn get(&self, path: &Path) -> Value {
        let mut node = &self.root;
        for segment in path.segments() {
            let next = match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(child) => node = child,
                None => return Value::Null,
            }
        }
        node.clone()
    }

    /// Entity tag of the node at `path`.
    pub fn version(&self, path: &Path) -> VersionToken {
        version_of(&self.get(path))
    }

    /// Replaces the value at `path` and returns the stored (normalized) value.
    pub fn set(&mut self, path: &Path, value: Value) -> Value {
        let value = normalize(value);
        if value.is_null() && self.get(path).is_null() {
            return Value::Null;
        }
        set_in(&mut self.root, path.segments(), value.clone());
        value
    }

    /// Deletes the node at `path`.
    pub fn delete(&mut self, path: &Path) {
        self.set(path, Value::Null);
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.root.is_null()
    }
}

fn set_in(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    let mut map = match std::mem::take(node) {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Map::new(),
    };

    let mut child = map.remove(head).unwrap_or(Value::Null);
    set_in(&mut child, rest, value);
    if !child.is_null() {
        map.insert(head.clone(), child);
    }

    *node = if map.is_empty() {
        Value::Null
    } else {
        Value::Object(map)
    };
}

/// Drops null members and empty containers.
fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if map.is_empty() {
                Value::Null
            } else {
                Value::Object(map)
            }
        }
        Value::Array(items) => {
            let items: Vec<Value> = items.into_iter().map(normalize).collect();
            if items.iter().all(Value::is_null) {
                Value::Null
            } else {
                Value::Array(items)
            }
        }
        other => other,
    }
}

/// Nesting depth of a value: scalars are 0, containers add one level.
pub(crate) fn depth_of(value: &Value) -> usize {
    match value {
        Value::Object(map) => 1 + map.values().map(depth_of).max().unwrap_or(0),
        Value::Array(items) => 1 + items.iter().map(depth_of).max().unwrap_or(0),
        _ => 0,
    }
}
