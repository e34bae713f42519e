//! REST request and response messages.
//!
//! The store speaks a small subset of HTTP: `GET`, `PUT` and `DELETE` on
//! `{base}/{path}.json`, with entity tags carried in headers. These types are
//! transport-agnostic; an HTTP client implementation maps them onto real
//! requests.

use crate::codec::{decode_value, encode_value};
use crate::error::{ProtocolError, ProtocolResult};
use crate::version::VersionToken;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Header names (lower case).
pub mod headers {
    /// Entity tag of the node's current value, on responses.
    pub const ETAG: &str = "etag";
    /// Conditional write precondition, on requests.
    pub const IF_MATCH: &str = "if-match";
    /// Asks the store to include an `etag` header on a read.
    pub const REQUEST_ETAG: &str = "x-firebase-etag";
    /// Body media type.
    pub const CONTENT_TYPE: &str = "content-type";
    /// Media type of JSON bodies.
    pub const JSON: &str = "application/json";
}

/// Status codes used by the store.
pub mod status {
    /// Request applied.
    pub const OK: u16 = 200;
    /// Malformed request (bad path, bad body).
    pub const BAD_REQUEST: u16 = 400;
    /// Missing or invalid credentials.
    pub const UNAUTHORIZED: u16 = 401;
    /// Credentials lack permission.
    pub const FORBIDDEN: u16 = 403;
    /// Method not supported.
    pub const METHOD_NOT_ALLOWED: u16 = 405;
    /// `if-match` did not match the current entity tag.
    pub const PRECONDITION_FAILED: u16 = 412;
    /// Body exceeds the store's limit.
    pub const PAYLOAD_TOO_LARGE: u16 = 413;
    /// Store-side failure.
    pub const INTERNAL_ERROR: u16 = 500;
    /// Store temporarily unavailable.
    pub const SERVICE_UNAVAILABLE: u16 = 503;
}

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read a node.
    Get,
    /// Replace a node's value.
    Put,
    /// Delete a node.
    Delete,
}

impl Method {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive header map. Names are stored lower case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a header.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Looks up a header.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Returns true if the header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Write precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional write.
    Any,
    /// Apply only if the node's current entity tag equals this token.
    Matches(VersionToken),
}

impl Precondition {
    /// Token the write is guarded by, if any.
    pub fn token(&self) -> Option<&VersionToken> {
        match self {
            Precondition::Any => None,
            Precondition::Matches(token) => Some(token),
        }
    }
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Headers.
    pub headers: Headers,
    /// Body bytes (empty for `GET` and `DELETE`).
    pub body: Vec<u8>,
    /// Deadline for the round trip, honored by the HTTP client.
    pub timeout: Option<Duration>,
}

impl Request {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: Vec::new(),
            timeout: None,
        }
    }

    /// A read that asks for the entity tag.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url).with_header(headers::REQUEST_ETAG, "true")
    }

    /// A value replacement.
    pub fn put(url: impl Into<String>, value: &Value) -> ProtocolResult<Self> {
        let mut request = Self::new(Method::Put, url)
            .with_header(headers::CONTENT_TYPE, headers::JSON)
            .with_header(headers::REQUEST_ETAG, "true");
        request.body = encode_value(value)?;
        Ok(request)
    }

    /// A deletion.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url).with_header(headers::REQUEST_ETAG, "true")
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Guards the request with a precondition.
    pub fn with_precondition(self, precondition: &Precondition) -> Self {
        match precondition {
            Precondition::Any => self,
            Precondition::Matches(token) => self.with_header(headers::IF_MATCH, token.as_str()),
        }
    }

    /// Sets the round-trip deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The `if-match` token, if the request is conditional.
    pub fn if_match(&self) -> Option<VersionToken> {
        self.headers.get(headers::IF_MATCH).map(VersionToken::from)
    }

    /// Decodes the body.
    pub fn body_json(&self) -> ProtocolResult<Value> {
        decode_value(&self.body)
    }
}

/// An incoming response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: u16,
    /// Headers.
    pub headers: Headers,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a response with an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// Creates a response with a JSON body.
    pub fn json(status: u16, value: &Value) -> ProtocolResult<Self> {
        let mut response = Self::new(status).with_header(headers::CONTENT_TYPE, headers::JSON);
        response.body = encode_value(value)?;
        Ok(response)
    }

    /// Creates an error response with a `{"error": message}` body.
    pub fn error(status: u16, message: &str) -> Self {
        let mut response = Self::new(status).with_header(headers::CONTENT_TYPE, headers::JSON);
        response.body = serde_json::json!({ "error": message }).to_string().into_bytes();
        response
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attaches an entity tag.
    pub fn with_etag(self, token: &VersionToken) -> Self {
        self.with_header(headers::ETAG, token.as_str())
    }

    /// Returns true for 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true for 412.
    pub fn is_precondition_failed(&self) -> bool {
        self.status == status::PRECONDITION_FAILED
    }

    /// The entity tag header, if present.
    pub fn etag(&self) -> Option<VersionToken> {
        self.headers.get(headers::ETAG).map(VersionToken::from)
    }

    /// The entity tag header, or an error if absent.
    pub fn require_etag(&self) -> ProtocolResult<VersionToken> {
        self.etag().ok_or(ProtocolError::MissingHeader(headers::ETAG))
    }

    /// Decodes the body.
    pub fn body_json(&self) -> ProtocolResult<Value> {
        decode_value(&self.body)
    }

    /// Body as text, for diagnostics.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Error message from a `{"error": ...}` body, falling back to the raw text.
    pub fn error_message(&self) -> String {
        match self.body_json() {
            Ok(Value::Object(map)) => match map.get("error") {
                Some(Value::String(message)) => message.clone(),
                _ => self.body_text(),
            },
            _ => self.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("ETag", "abc");
        assert_eq!(headers.get("etag"), Some("abc"));
        assert_eq!(headers.get("ETAG"), Some("abc"));
        assert_eq!(headers.iter().next(), Some(("etag", "abc")));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn conditional_put() {
        let token = VersionToken::new("t1");
        let request = Request::put("https://db/a.json", &json!({"k": 1}))
            .unwrap()
            .with_precondition(&Precondition::Matches(token.clone()));

        assert_eq!(request.method, Method::Put);
        assert_eq!(request.if_match(), Some(token));
        assert_eq!(request.body_json().unwrap(), json!({"k": 1}));
        assert!(request.headers.contains(headers::REQUEST_ETAG));
    }

    #[test]
    fn unconditional_delete() {
        let request = Request::delete("https://db/a.json").with_precondition(&Precondition::Any);
        assert_eq!(request.if_match(), None);
        assert!(request.body.is_empty());
        assert_eq!(request.body_json().unwrap(), Value::Null);
    }

    #[test]
    fn get_requests_etag() {
        let request = Request::get("https://db/a.json").with_timeout(Duration::from_secs(5));
        assert_eq!(request.headers.get(headers::REQUEST_ETAG), Some("true"));
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn response_etag() {
        let response = Response::json(status::OK, &json!(5))
            .unwrap()
            .with_etag(&VersionToken::new("t1"));
        assert!(response.is_success());
        assert_eq!(response.require_etag().unwrap(), VersionToken::new("t1"));
        assert_eq!(response.body_json().unwrap(), json!(5));

        let bare = Response::new(status::OK);
        assert!(matches!(
            bare.require_etag(),
            Err(ProtocolError::MissingHeader(headers::ETAG))
        ));
    }

    #[test]
    fn error_response() {
        let response = Response::error(status::PRECONDITION_FAILED, "etag mismatch");
        assert!(response.is_precondition_failed());
        assert!(!response.is_success());
        assert_eq!(response.error_message(), "etag mismatch");

        let mut plain = Response::new(status::INTERNAL_ERROR);
        plain.body = b"boom".to_vec();
        assert_eq!(plain.error_message(), "boom");
    }

    #[test]
    fn precondition_token() {
        assert_eq!(Precondition::Any.token(), None);
        let token = VersionToken::new("t");
        assert_eq!(Precondition::Matches(token.clone()).token(), Some(&token));
    }
}
