//! In-memory test client.

use http::{HeaderName, HeaderValue, Method, Uri};
use serde::Serialize;
use tessera_core::Request;
use tessera_server::Router;

use crate::error::{TestError, TestResult};
use crate::response::TestResponse;

/// A client that dispatches requests to a frozen [`Router`] without a
/// network.
///
/// # Example
///
/// ```rust
/// use http::StatusCode;
/// use serde_json::json;
/// use tessera_extract::{BoundArgs, Param, Signature};
/// use tessera_server::App;
/// use tessera_test::TestClient;
///
/// # tokio_test::block_on(async {
/// let mut app = App::new();
/// app.get(
///     "/items/{id}",
///     Signature::new("read_item").param(Param::typed::<i64>("id")),
///     |args: BoundArgs| async move { Ok(json!({ "id": args.get::<i64>("id")? })) },
/// )
/// .unwrap();
///
/// let client = TestClient::new(app.into_router().unwrap());
/// client
///     .get("/items/42")
///     .send()
///     .await
///     .assert_status(StatusCode::OK)
///     .assert_json_eq(&json!({ "id": 42 }));
/// # });
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct TestClient {
    router: Router,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client over `router`.
    pub fn new(router: Router) -> Self {
        Self {
            router,
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the router.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Creates a GET request builder.
    pub fn get(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Creates a POST request builder.
    pub fn post(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Creates a PUT request builder.
    pub fn put(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Creates a PATCH request builder.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Creates a DELETE request builder.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Creates a request builder with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestRequest<'_> {
        let mut request = TestRequest {
            client: self,
            method,
            uri: uri.as_ref().to_string(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Vec::new(),
            error: None,
        };
        for (name, value) in &self.default_headers {
            request = request.header(name, value);
        }
        request
    }
}

/// A request builder bound to a [`TestClient`].
#[must_use]
pub struct TestRequest<'a> {
    client: &'a TestClient,
    method: Method,
    uri: String,
    query: Vec<(String, String)>,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Vec<u8>,
    error: Option<TestError>,
}

impl TestRequest<'_> {
    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => self.headers.push((name, value)),
            _ => self.fail(TestError::InvalidHeader(name.to_string())),
        }
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Serializes `value` as the JSON body and sets `content-type`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = bytes,
            Err(e) => self.fail(TestError::Json(e)),
        }
        self.header("content-type", "application/json")
    }

    /// Dispatches the request, runs any post-send callback, and returns
    /// the captured response.
    ///
    /// # Panics
    ///
    /// Panics if the request could not be built; use
    /// [`try_send`](Self::try_send) to handle that as an error.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Like [`send`](Self::send), but returns build errors.
    pub async fn try_send(self) -> TestResult<TestResponse> {
        let client = self.client;
        let request = self.build()?;

        // The response is captured before the callback runs, as a
        // transport would deliver it first.
        let mut response = client.router.dispatch(request).await;
        let post_send = response.take_post_send();
        let (status, headers, body, _) = response.into_parts();

        let post_send_ran = match post_send {
            Some(callback) => {
                callback.run().await;
                true
            }
            None => false,
        };

        Ok(TestResponse::new(status, headers, body, post_send_ran))
    }

    fn fail(&mut self, error: TestError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn build(self) -> TestResult<Request> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut uri = self.uri;
        if !self.query.is_empty() {
            let encoded = serde_urlencoded::to_string(&self.query)
                .map_err(|e| TestError::RequestBuild(format!("invalid query: {e}")))?;
            uri.push(if uri.contains('?') { '&' } else { '?' });
            uri.push_str(&encoded);
        }
        uri.parse::<Uri>()
            .map_err(|e| TestError::RequestBuild(format!("invalid URI `{uri}`: {e}")))?;

        let mut builder = Request::builder().method(self.method).uri(&uri);
        for (name, value) in &self.headers {
            if let Ok(value) = value.to_str() {
                builder = builder.header(name.as_str(), value);
            }
        }
        Ok(builder.body(self.body).build())
    }
}
