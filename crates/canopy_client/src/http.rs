//! HTTP transport implementation.
//!
//! This module maps store operations onto the REST interface. The actual
//! HTTP client is abstracted via a trait to allow different implementations
//! (reqwest, ureq, hyper) or the in-process loopback used by tests.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::{ConflictResponse, NodeRead, StoreTransport, WriteOp, WriteOutcome};
use canopy_protocol::{Path, Precondition, Request, Response};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

/// HTTP client abstraction.
///
/// Implementations send the request and return whatever response arrived,
/// regardless of status. Failures to obtain a response are errors: a missed
/// `request.timeout` deadline must be reported as [`ClientError::Timeout`].
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    fn send(&self, request: &Request) -> ClientResult<Response>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// REST transport over an [`HttpClient`].
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the store (e.g., "https://example.firebaseio.com").
    base_url: String,
    /// HTTP client implementation.
    client: C,
    /// Deadline stamped on every request.
    timeout: Option<Duration>,
    /// Connection state.
    connected: AtomicBool,
    /// Last error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            timeout: None,
            connected: AtomicBool::new(true),
            last_error: RwLock::new(None),
        }
    }

    /// Creates a transport from client configuration.
    pub fn from_config(config: &ClientConfig, client: C) -> Self {
        Self::new(config.base_url.clone(), client).with_timeout(config.timeout)
    }

    /// Sets the per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn send(&self, request: Request) -> ClientResult<(Request, Response)> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let request = match self.timeout {
            Some(timeout) => request.with_timeout(timeout),
            None => request,
        };

        match self.client.send(&request) {
            Ok(response) => {
                *self.last_error.write() = None;
                Ok((request, response))
            }
            Err(err) => {
                warn!(method = %request.method, url = %request.url, error = %err, "request failed");
                *self.last_error.write() = Some(err.to_string());
                Err(err)
            }
        }
    }
}

/// Converts a non-success response into an error.
fn unexpected_status(response: &Response) -> ClientError {
    ClientError::Server {
        status: response.status,
        message: response.error_message(),
    }
}

impl<C: HttpClient> StoreTransport for HttpTransport<C> {
    fn read_node(&self, path: &Path) -> ClientResult<NodeRead> {
        let (_, response) = self.send(Request::get(path.to_url(&self.base_url)))?;
        if !response.is_success() {
            return Err(unexpected_status(&response));
        }

        Ok(NodeRead {
            version: response.require_etag()?,
            value: response.body_json()?,
        })
    }

    fn write_node(
        &self,
        path: &Path,
        op: &WriteOp,
        precondition: &Precondition,
    ) -> ClientResult<WriteOutcome> {
        let url = path.to_url(&self.base_url);
        let request = match op {
            WriteOp::Set(value) => Request::put(url, value)?,
            WriteOp::Remove => Request::delete(url),
        }
        .with_precondition(precondition);

        let (request, response) = self.send(request)?;
        if response.is_precondition_failed() {
            return Ok(WriteOutcome::Conflict(ConflictResponse { request, response }));
        }
        if !response.is_success() {
            return Err(unexpected_status(&response));
        }

        Ok(WriteOutcome::Applied(response.require_etag()?))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.client.is_healthy()
    }

    fn close(&self) -> ClientResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Trait for servers that can answer loopback requests.
pub trait LoopbackServer {
    /// Handles a request and returns the response.
    fn handle(&self, request: &Request) -> Response;
}

impl<F> LoopbackServer for F
where
    F: Fn(&Request) -> Response,
{
    fn handle(&self, request: &Request) -> Response {
        self(request)
    }
}

/// An HTTP client that hands requests directly to an in-process server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn send(&self, request: &Request) -> ClientResult<Response> {
        Ok(self.server.handle(request))
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_protocol::{headers, status, Method, Value, VersionToken};
    use serde_json::json;

    struct TestClient {
        response: RwLock<Option<Response>>,
        sent: RwLock<Vec<Request>>,
        healthy: AtomicBool,
    }

    impl TestClient {
        fn new() -> Self {
            Self {
                response: RwLock::new(None),
                sent: RwLock::new(Vec::new()),
                healthy: AtomicBool::new(true),
            }
        }

        fn set_response(&self, response: Response) {
            *self.response.write() = Some(response);
        }

        fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }

        fn last_sent(&self) -> Request {
            self.sent.read().last().cloned().unwrap()
        }
    }

    impl HttpClient for TestClient {
        fn send(&self, request: &Request) -> ClientResult<Response> {
            self.sent.write().push(request.clone());
            self.response
                .read()
                .clone()
                .ok_or_else(|| ClientError::transport_retryable("no response set"))
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    fn path(raw: &str) -> Path {
        Path::parse(raw).unwrap()
    }

    #[test]
    fn transport_creation() {
        let config = ClientConfig::new("https://db.example.com").with_timeout(Duration::from_secs(3));
        let transport = HttpTransport::from_config(&config, TestClient::new());
        assert_eq!(transport.base_url(), "https://db.example.com");
        assert!(transport.is_connected());
        assert!(transport.last_error().is_none());
    }

    #[test]
    fn transport_disconnect() {
        let transport = HttpTransport::new("https://db.example.com", TestClient::new());
        transport.close().unwrap();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.read_node(&path("/a")),
            Err(ClientError::NotConnected)
        ));
    }

    #[test]
    fn transport_unhealthy_client() {
        let client = TestClient::new();
        client.set_healthy(false);
        let transport = HttpTransport::new("https://db.example.com", client);
        assert!(!transport.is_connected());
    }

    #[test]
    fn read_maps_body_and_etag() {
        let client = TestClient::new();
        client.set_response(
            Response::json(status::OK, &json!(5))
                .unwrap()
                .with_etag(&VersionToken::new("t1")),
        );
        let transport = HttpTransport::new("https://db.example.com", client)
            .with_timeout(Duration::from_secs(2));

        let read = transport.read_node(&path("/counter")).unwrap();
        assert_eq!(read.value, json!(5));
        assert_eq!(read.version, VersionToken::new("t1"));

        let sent = transport.client().last_sent();
        assert_eq!(sent.method, Method::Get);
        assert_eq!(sent.url, "https://db.example.com/counter.json");
        assert_eq!(sent.headers.get(headers::REQUEST_ETAG), Some("true"));
        assert_eq!(sent.timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn read_without_etag_is_protocol_error() {
        let client = TestClient::new();
        client.set_response(Response::json(status::OK, &json!(5)).unwrap());
        let transport = HttpTransport::new("https://db.example.com", client);

        assert!(matches!(
            transport.read_node(&path("/counter")),
            Err(ClientError::Protocol(_))
        ));
    }

    #[test]
    fn conditional_write_sends_if_match() {
        let client = TestClient::new();
        client.set_response(
            Response::json(status::OK, &json!(6))
                .unwrap()
                .with_etag(&VersionToken::new("t2")),
        );
        let transport = HttpTransport::new("https://db.example.com", client);

        let outcome = transport
            .write_node(
                &path("/counter"),
                &WriteOp::Set(json!(6)),
                &Precondition::Matches(VersionToken::new("t1")),
            )
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Applied(VersionToken::new("t2")));

        let sent = transport.client().last_sent();
        assert_eq!(sent.method, Method::Put);
        assert_eq!(sent.if_match(), Some(VersionToken::new("t1")));
        assert_eq!(sent.body_json().unwrap(), json!(6));
    }

    #[test]
    fn precondition_failure_is_conflict_outcome() {
        let client = TestClient::new();
        client.set_response(
            Response::json(status::PRECONDITION_FAILED, &json!(99))
                .unwrap()
                .with_etag(&VersionToken::new("t9")),
        );
        let transport = HttpTransport::new("https://db.example.com", client);

        let outcome = transport
            .write_node(
                &path("/counter"),
                &WriteOp::Remove,
                &Precondition::Matches(VersionToken::new("t1")),
            )
            .unwrap();

        match outcome {
            WriteOutcome::Conflict(conflict) => {
                assert_eq!(conflict.request.method, Method::Delete);
                assert_eq!(conflict.response.status, status::PRECONDITION_FAILED);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn server_errors_are_not_conflicts() {
        let client = TestClient::new();
        client.set_response(Response::error(status::SERVICE_UNAVAILABLE, "try later"));
        let transport = HttpTransport::new("https://db.example.com", client);

        let err = transport
            .write_node(&path("/a"), &WriteOp::Set(Value::Null), &Precondition::Any)
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Server { status: 503, ref message } if message == "try later"
        ));
        assert!(err.is_retryable());
        assert!(!err.is_conflict());
    }

    #[test]
    fn client_failure_is_recorded() {
        let transport = HttpTransport::new("https://db.example.com", TestClient::new());
        let err = transport.read_node(&path("/a")).unwrap_err();
        assert!(matches!(err, ClientError::Transport { retryable: true, .. }));
        assert_eq!(transport.last_error().as_deref(), Some("transport error: no response set"));
    }
}
