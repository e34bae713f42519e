//! Request handlers for the REST endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::tree::{depth_of, version_of, NodeTree};
use canopy_protocol::{headers, status, Method, Path, Request, Response, Value, VersionToken};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// State shared by all handlers.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Stored data.
    tree: RwLock<NodeTree>,
    /// Number of applied writes.
    writes: AtomicU64,
}

impl HandlerContext {
    /// Creates a context over an empty tree.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            tree: RwLock::new(NodeTree::new()),
            writes: AtomicU64::new(0),
        }
    }

    /// Current value at `path`.
    pub fn value_at(&self, path: &Path) -> Value {
        self.tree.read().get(path)
    }

    /// Current entity tag at `path`.
    pub fn version_at(&self, path: &Path) -> VersionToken {
        self.tree.read().version(path)
    }

    /// Number of writes applied so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Applies a write if `expected` matches the node's current tag.
    ///
    /// Returns `Ok(stored, tag)` on success and `Err(current, tag)` when the
    /// precondition fails. Check and write happen under the same lock.
    pub fn write(
        &self,
        path: &Path,
        value: Value,
        expected: Option<&VersionToken>,
    ) -> Result<(Value, VersionToken), (Value, VersionToken)> {
        let mut tree = self.tree.write();

        if let Some(expected) = expected {
            let current = tree.get(path);
            let current_version = version_of(&current);
            if &current_version != expected {
                return Err((current, current_version));
            }
        }

        let stored = tree.set(path, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        let version = version_of(&stored);
        Ok((stored, version))
    }
}

/// Handler for store requests.
pub struct RequestHandler<'a> {
    context: &'a HandlerContext,
}

impl<'a> RequestHandler<'a> {
    /// Creates a handler over a context.
    pub fn new(context: &'a HandlerContext) -> Self {
        Self { context }
    }

    /// Handles a request. Errors become error responses.
    pub fn handle(&self, request: &Request) -> Response {
        let result = match request.method {
            Method::Get => self.handle_get(request),
            Method::Put => self.handle_put(request),
            Method::Delete => self.handle_delete(request),
        };

        result.unwrap_or_else(|err| {
            warn!(method = %request.method, url = %request.url, error = %err, "request rejected");
            Response::error(err.status(), &err.to_string())
        })
    }

    /// Handles a read.
    pub fn handle_get(&self, request: &Request) -> ServerResult<Response> {
        let path = Path::from_url(&request.url)?;
        let value = self.context.value_at(&path);
        let version = version_of(&value);
        debug!(path = %path, version = %version, "read");

        let response = Response::json(status::OK, &value)?;
        Ok(self.attach_etag(request, response, &version))
    }

    /// Handles a value replacement.
    pub fn handle_put(&self, request: &Request) -> ServerResult<Response> {
        let path = Path::from_url(&request.url)?;
        if request.body.len() > self.context.config.max_body_bytes {
            return Err(ServerError::PayloadTooLarge {
                size: request.body.len(),
                limit: self.context.config.max_body_bytes,
            });
        }

        let value = request.body_json()?;
        let depth = path.depth() + depth_of(&value);
        if depth > self.context.config.max_nesting_depth {
            return Err(ServerError::TooDeep {
                depth,
                limit: self.context.config.max_nesting_depth,
            });
        }

        self.write(request, &path, value)
    }

    /// Handles a deletion.
    pub fn handle_delete(&self, request: &Request) -> ServerResult<Response> {
        let path = Path::from_url(&request.url)?;
        self.write(request, &path, Value::Null)
    }

    fn write(&self, request: &Request, path: &Path, value: Value) -> ServerResult<Response> {
        let expected = request.if_match();

        match self.context.write(path, value, expected.as_ref()) {
            Ok((stored, version)) => {
                debug!(path = %path, method = %request.method, version = %version, "write applied");
                let response = Response::json(status::OK, &stored)?;
                Ok(self.attach_etag(request, response, &version))
            }
            Err((current, version)) => {
                debug!(
                    path = %path,
                    expected = ?expected.as_ref().map(VersionToken::as_str),
                    actual = %version,
                    "precondition failed"
                );
                // The current value and tag travel back so the caller can re-base.
                let response = Response::json(status::PRECONDITION_FAILED, &current)?;
                Ok(response.with_etag(&version))
            }
        }
    }

    fn attach_etag(&self, request: &Request, response: Response, version: &VersionToken) -> Response {
        let asked = request.headers.get(headers::REQUEST_ETAG) == Some("true")
            || request.headers.contains(headers::IF_MATCH);
        if asked || self.context.config.always_return_etag {
            response.with_etag(version)
        } else {
            response
        }
    }
}
