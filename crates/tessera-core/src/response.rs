//! Response envelope.
//!
//! A [`Response`] carries a status, headers, a JSON body and an optional
//! [`PostSend`] callback. The transport serializes the body, delivers the
//! response and only then runs the callback.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde::Serialize;
use std::fmt;
use std::future::Future;

/// Work to run after a response has been handed to the client.
pub struct PostSend(Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>);

impl PostSend {
    /// Wraps an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Box::new(move || f().boxed()))
    }

    /// Returns a callback that runs `self` and then `next`.
    #[must_use]
    pub fn then(self, next: PostSend) -> Self {
        Self::new(move || async move {
            self.run().await;
            next.run().await;
        })
    }

    /// Runs the callback.
    pub async fn run(self) {
        (self.0)().await;
    }
}

impl fmt::Debug for PostSend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PostSend(..)")
    }
}

/// The response envelope handed to the transport.
///
/// # Example
///
/// ```rust
/// use tessera_core::Response;
/// use http::StatusCode;
/// use serde_json::json;
///
/// let response = Response::json(StatusCode::CREATED, json!({ "id": 7 }));
/// assert_eq!(response.status(), StatusCode::CREATED);
/// assert_eq!(response.body()["id"], 7);
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: serde_json::Value,
    post_send: Option<PostSend>,
}

impl Response {
    /// Creates a 200 response with a JSON body.
    #[must_use]
    pub fn new(body: serde_json::Value) -> Self {
        Self::json(StatusCode::OK, body)
    }

    /// Creates a JSON response with the given status.
    #[must_use]
    pub fn json(status: StatusCode, body: serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body,
            post_send: None,
        }
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attaches a post-send callback, replacing any previous one.
    #[must_use]
    pub fn with_post_send(mut self, post_send: PostSend) -> Self {
        self.post_send = Some(post_send);
        self
    }

    /// Returns the status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the JSON body.
    #[must_use]
    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }

    /// Returns true if a post-send callback is attached.
    #[must_use]
    pub fn has_post_send(&self) -> bool {
        self.post_send.is_some()
    }

    /// Detaches the post-send callback so the transport can run it after delivery.
    pub fn take_post_send(&mut self) -> Option<PostSend> {
        self.post_send.take()
    }

    /// Serializes the body into bytes.
    pub fn body_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(&self.body).map(Bytes::from)
    }

    /// Splits the envelope into its status, headers, body and callback.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, serde_json::Value, Option<PostSend>) {
        (self.status, self.headers, self.body, self.post_send)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(serde_json::Value::Null)
    }
}

/// A serializable handler return value.
///
/// Wrapped as a 200 JSON response by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> Json<T> {
    /// Serializes the inner value.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }
}
