//! Request abstraction.
//!
//! The binder only needs three capabilities from an incoming request: path
//! parameters, query parameters, and the raw body. [`Request`] provides those
//! plus the method, URI, headers and a [`RequestId`] for log correlation.

use crate::params::Params;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Header carrying a caller-supplied request id.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// A time-ordered (UUID v7) request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An incoming request as seen by the binder.
///
/// # Example
///
/// ```rust
/// use tessera_core::Request;
///
/// let request = Request::builder()
///     .uri("/items/42?q=shoe")
///     .path_param("id", "42")
///     .build();
///
/// assert_eq!(request.path(), "/items/42");
/// assert_eq!(request.path_param("id"), Some("42"));
/// assert_eq!(request.query_param("q"), Some("shoe"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    path_params: Params,
    query: Params,
    body: Bytes,
}

impl Request {
    /// Creates a request. The query map is parsed from the URI.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        let query = uri.query().map(Params::from_query).unwrap_or_default();
        let id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .map_or_else(RequestId::new, RequestId);
        Self {
            id,
            method,
            uri,
            headers,
            path_params: Params::new(),
            query,
            body,
        }
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Replaces the path parameters. Called by the transport after matching.
    #[must_use]
    pub fn with_path_params(mut self, params: Params) -> Self {
        self.path_params = params;
        self
    }

    /// Returns the request id.
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the URI path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns all path parameters.
    #[must_use]
    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    /// Returns all query parameters.
    #[must_use]
    pub fn query_params(&self) -> &Params {
        &self.query
    }

    /// Returns a raw path parameter.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// Returns a raw query value. A repeated key yields its last value.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.last(name)
    }

    /// Returns the body length in bytes.
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Reads the full body.
    pub async fn read_body(&self) -> Bytes {
        self.body.clone()
    }
}

/// Builder for [`Request`]. Defaults to `GET /`.
#[derive(Debug, Default)]
#[must_use]
pub struct RequestBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HeaderMap,
    path_params: Params,
    body: Bytes,
}

impl RequestBuilder {
    /// Sets the method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the URI. An unparseable URI is ignored.
    pub fn uri(mut self, uri: &str) -> Self {
        if let Ok(uri) = uri.parse() {
            self.uri = Some(uri);
        }
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Adds a path parameter.
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push(name, value);
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the request.
    #[must_use]
    pub fn build(self) -> Request {
        Request::new(
            self.method.unwrap_or(Method::GET),
            self.uri.unwrap_or_else(|| Uri::from_static("/")),
            self.headers,
            self.body,
        )
        .with_path_params(self.path_params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let request = Request::builder().build();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/");
        assert!(request.query_params().is_empty());
        assert_eq!(request.body_len(), 0);
    }

    #[test]
    fn test_query_last_value_wins() {
        let request = Request::builder().uri("/search?q=a&q=b").build();
        assert_eq!(request.query_param("q"), Some("b"));
        assert_eq!(request.query_param("missing"), None);
    }

    #[test]
    fn test_request_id_from_header() {
        let id = "01890f2c-8a5e-7cc3-9b1a-3f1e2d4c5b6a";
        let request = Request::builder().header("x-request-id", id).build();
        assert_eq!(request.id().to_string(), id);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = Request::builder().build();
        let b = Request::builder().build();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_read_body() {
        let request = Request::builder()
            .method(Method::POST)
            .header("content-type", "application/json")
            .body(r#"{"name":"shoe"}"#)
            .build();
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.read_body().await, Bytes::from(r#"{"name":"shoe"}"#));
    }
}
