//! Test response wrapper.

use std::fmt;

use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{TestError, TestResult};

/// A response captured by [`TestClient`](crate::TestClient), with
/// assertion helpers.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
    post_send_ran: bool,
}

impl TestResponse {
    /// Creates a test response from raw parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Value, post_send_ran: bool) -> Self {
        Self {
            status,
            headers,
            body,
            post_send_ran,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns true if the status is successful (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns a reference to the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Returns the JSON body.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Returns the body serialized as text.
    pub fn text(&self) -> TestResult<String> {
        Ok(serde_json::to_string(&self.body)?)
    }

    /// Deserializes the body.
    pub fn json<T: DeserializeOwned>(&self) -> TestResult<T> {
        serde_json::from_value(self.body.clone()).map_err(TestError::Json)
    }

    /// Whether a post-send callback was attached and has run.
    #[must_use]
    pub fn post_send_ran(&self) -> bool {
        self.post_send_ran
    }

    /// Asserts that the status code equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {} with body {}",
            expected, self.status, self.body
        );
        self
    }

    /// Asserts that the JSON body equals `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't match.
    pub fn assert_json_eq(&self, expected: &Value) -> &Self {
        assert_eq!(&self.body, expected, "JSON body mismatch");
        self
    }

    /// Asserts that the field at a dotted path (`items.0.name`) equals
    /// `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the field doesn't exist or doesn't match.
    pub fn assert_json_field(&self, path: impl AsRef<str>, expected: &Value) -> &Self {
        let path = path.as_ref();
        let actual = json_path(&self.body, path)
            .unwrap_or_else(|| panic!("JSON path '{}' not found in: {}", path, self.body));
        assert_eq!(
            actual, expected,
            "JSON field '{}': expected {}, got {}",
            path, expected, actual
        );
        self
    }

    /// Asserts an error response: `status` and `{"error": message}`.
    ///
    /// # Panics
    ///
    /// Panics if the status or the error message doesn't match.
    pub fn assert_error(&self, status: StatusCode, message: &str) -> &Self {
        self.assert_status(status);
        assert_eq!(
            self.body.get("error").and_then(Value::as_str),
            Some(message),
            "error message mismatch in {}",
            self.body
        );
        self
    }

    /// Asserts whether a post-send callback ran.
    ///
    /// # Panics
    ///
    /// Panics if the expectation doesn't hold.
    pub fn assert_post_send(&self, expected: bool) -> &Self {
        assert_eq!(
            self.post_send_ran, expected,
            "post-send callback: expected ran={expected}"
        );
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("body", &self.body)
            .field("post_send_ran", &self.post_send_ran)
            .finish()
    }
}

fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match segment.parse::<usize>() {
            Ok(index) => current.get(index)?,
            Err(_) => current.get(segment)?,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: StatusCode, body: Value) -> TestResponse {
        TestResponse::new(status, HeaderMap::new(), body, false)
    }

    #[test]
    fn test_json_path() {
        let body = json!({ "items": [{ "name": "shoe" }] });
        assert_eq!(json_path(&body, "items.0.name"), Some(&json!("shoe")));
        assert_eq!(json_path(&body, "items.1"), None);
    }

    #[test]
    fn test_assertions_chain() {
        response(StatusCode::OK, json!({ "id": 42 }))
            .assert_status(StatusCode::OK)
            .assert_json_field("id", &json!(42))
            .assert_post_send(false);
    }

    #[test]
    fn test_assert_error() {
        response(StatusCode::BAD_REQUEST, json!({ "error": "Missing query: q" }))
            .assert_error(StatusCode::BAD_REQUEST, "Missing query: q");
    }

    #[test]
    #[should_panic(expected = "Expected status")]
    fn test_assert_status_panics() {
        response(StatusCode::NOT_FOUND, json!(null)).assert_status(StatusCode::OK);
    }

    #[test]
    fn test_typed_json() {
        #[derive(serde::Deserialize)]
        struct Item {
            id: i64,
        }

        let item: Item = response(StatusCode::OK, json!({ "id": 3 })).json().unwrap();
        assert_eq!(item.id, 3);
        assert_eq!(
            response(StatusCode::OK, json!([1])).text().unwrap(),
            "[1]"
        );
    }
}
