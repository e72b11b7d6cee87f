//! In-memory request routing.
//!
//! [`Router`] is the reference [`Transport`]: it matches method and path
//! against the registered templates and dispatches to the compiled handler.
//! Routes are checked in registration order; first match wins.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use futures_util::FutureExt;
//! use http::{Method, StatusCode};
//! use serde_json::json;
//! use tessera_core::{Request, Response};
//! use tessera_server::{Router, Transport};
//!
//! # tokio_test::block_on(async {
//! let mut router = Router::new();
//! router
//!     .register(
//!         "/items/{id}",
//!         Method::GET,
//!         Arc::new(|req: Request| {
//!             let id = req.path_param("id").unwrap_or_default().to_string();
//!             async move { Response::new(json!({ "id": id })) }.boxed()
//!         }),
//!     )
//!     .unwrap();
//!
//! let response = router.dispatch(Request::builder().uri("/items/7").build()).await;
//! assert_eq!(response.body()["id"], "7");
//!
//! let response = router.dispatch(Request::builder().uri("/nope").build()).await;
//! assert_eq!(response.status(), StatusCode::NOT_FOUND);
//! # });
//! ```

use std::fmt;

use http::{Method, StatusCode};
use serde_json::json;
use tessera_core::{ConfigurationError, PathTemplate, Request, Response};
use tracing::debug;

use crate::transport::{CompiledHandler, Transport};

#[derive(Clone)]
struct Route {
    method: Method,
    template: PathTemplate,
    handler: CompiledHandler,
}

/// Method and path router over compiled handlers.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if `method` and `path` template are registered.
    #[must_use]
    pub fn has_route(&self, method: &Method, path: &str) -> bool {
        self.routes
            .iter()
            .any(|r| r.method == *method && r.template.as_str() == path)
    }

    /// Routes a request and returns the handler's response.
    ///
    /// An unknown path gives 404 `{"error":"Not Found"}`. A known path with
    /// the wrong method gives 405 `{"error":"Method Not Allowed"}`.
    pub async fn dispatch(&self, request: Request) -> Response {
        let mut path_matched = false;

        for route in &self.routes {
            let Some(params) = route.template.match_path(request.path()) else {
                continue;
            };
            if route.method != request.method() {
                path_matched = true;
                continue;
            }
            return (route.handler)(request.with_path_params(params)).await;
        }

        if path_matched {
            debug!(method = %request.method(), path = %request.path(), "method not allowed");
            Response::json(
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "error": "Method Not Allowed" }),
            )
        } else {
            debug!(method = %request.method(), path = %request.path(), "no route matched");
            Response::json(StatusCode::NOT_FOUND, json!({ "error": "Not Found" }))
        }
    }
}

impl Transport for Router {
    fn register(
        &mut self,
        path: &str,
        method: Method,
        handler: CompiledHandler,
    ) -> Result<(), ConfigurationError> {
        let template = PathTemplate::parse(path)?;
        if self.has_route(&method, template.as_str()) {
            return Err(ConfigurationError::DuplicateRoute {
                method: method.to_string(),
                path: path.to_string(),
            });
        }

        self.routes.push(Route {
            method,
            template,
            handler,
        });
        Ok(())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: Vec<String> = self
            .routes
            .iter()
            .map(|r| format!("{} {}", r.method, r.template))
            .collect();
        f.debug_struct("Router").field("routes", &routes).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::Arc;

    fn echo(label: &'static str) -> CompiledHandler {
        Arc::new(move |req: Request| {
            let params: Vec<(String, String)> = req
                .path_params()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            async move { Response::new(json!({ "route": label, "params": params })) }.boxed()
        })
    }

    fn request(method: Method, uri: &str) -> Request {
        Request::builder().method(method).uri(uri).build()
    }

    #[tokio::test]
    async fn test_dispatch_extracts_params() {
        let mut router = Router::new();
        router.register("/users/{id}", Method::GET, echo("get_user")).unwrap();

        let response = router.dispatch(request(Method::GET, "/users/42")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body()["route"], "get_user");
        assert_eq!(response.body()["params"], json!([["id", "42"]]));
    }

    #[tokio::test]
    async fn test_dispatch_decodes_params() {
        let mut router = Router::new();
        router.register("/files/{name}", Method::GET, echo("file")).unwrap();

        let response = router
            .dispatch(request(Method::GET, "/files/hello%20world"))
            .await;
        assert_eq!(response.body()["params"], json!([["name", "hello world"]]));

        let response = router.dispatch(request(Method::GET, "/files/%FF")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let mut router = Router::new();
        router.register("/users/me", Method::GET, echo("me")).unwrap();
        router.register("/users/{id}", Method::GET, echo("by_id")).unwrap();

        let response = router.dispatch(request(Method::GET, "/users/me")).await;
        assert_eq!(response.body()["route"], "me");
    }

    #[tokio::test]
    async fn test_not_found() {
        let router = Router::new();
        let response = router.dispatch(request(Method::GET, "/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body(), &json!({ "error": "Not Found" }));
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let mut router = Router::new();
        router.register("/items", Method::GET, echo("list")).unwrap();

        let response = router.dispatch(request(Method::DELETE, "/items")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.body(), &json!({ "error": "Method Not Allowed" }));
    }

    #[test]
    fn test_duplicate_route() {
        let mut router = Router::new();
        router.register("/items", Method::GET, echo("a")).unwrap();
        router.register("/items", Method::POST, echo("b")).unwrap();

        let err = router.register("/items", Method::GET, echo("c")).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateRoute {
                method: "GET".to_string(),
                path: "/items".to_string(),
            }
        );
        assert_eq!(router.route_count(), 2);
    }

    #[test]
    fn test_debug_lists_routes() {
        let mut router = Router::new();
        router.register("/items/{id}", Method::PUT, echo("put")).unwrap();
        assert!(format!("{router:?}").contains("PUT /items/{id}"));
    }
}
