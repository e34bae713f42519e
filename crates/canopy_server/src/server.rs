//! Main store server.

use crate::config::ServerConfig;
use crate::handler::{HandlerContext, RequestHandler};
use canopy_protocol::{Path, Request, Response, Value, VersionToken};
use std::sync::Arc;

/// The store server.
///
/// Holds one JSON tree and answers REST requests against it. Direct methods
/// (`put`, `remove`, `value_at`) bypass the request layer; tests use them to
/// play the part of another writer.
///
/// # Example
///
/// ```
/// use canopy_protocol::{Path, Request};
/// use canopy_server::{ServerConfig, StoreServer};
///
/// let server = StoreServer::new(ServerConfig::default());
/// let path = Path::parse("/counter").unwrap();
/// server.put(&path, serde_json::json!(5));
///
/// let response = server.handle(&Request::get(path.to_url("https://db.test")));
/// assert_eq!(response.body_json().unwrap(), serde_json::json!(5));
/// assert!(response.etag().is_some());
/// ```
#[derive(Clone)]
pub struct StoreServer {
    context: Arc<HandlerContext>,
}

impl StoreServer {
    /// Creates an empty store.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            context: Arc::new(HandlerContext::new(config)),
        }
    }

    /// Handles a request.
    pub fn handle(&self, request: &Request) -> Response {
        RequestHandler::new(&self.context).handle(request)
    }

    /// Current value at `path`.
    pub fn value_at(&self, path: &Path) -> Value {
        self.context.value_at(path)
    }

    /// Current entity tag at `path`.
    pub fn version_at(&self, path: &Path) -> VersionToken {
        self.context.version_at(path)
    }

    /// Unconditionally writes a value and returns its new tag.
    pub fn put(&self, path: &Path, value: Value) -> VersionToken {
        match self.context.write(path, value, None) {
            Ok((_, version)) | Err((_, version)) => version,
        }
    }

    /// Unconditionally deletes a node.
    pub fn remove(&self, path: &Path) {
        self.put(path, Value::Null);
    }

    /// Number of writes applied so far.
    pub fn write_count(&self) -> u64 {
        self.context.write_count()
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }
}

impl Default for StoreServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
