//! The runtime request binder.

use crate::args::{BoundArgs, BoundValue};
use crate::plan::BindingPlan;
use std::sync::Arc;
use tessera_core::{BindError, BindResult, Request, ScopeStack};
use tessera_tasks::BackgroundTasks;
use tracing::{debug, instrument};

/// Default maximum body size (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Walks a [`BindingPlan`] against a request.
///
/// Steps run in a fixed order and the first failure aborts the rest:
///
/// 1. the raw request
/// 2. path parameters
/// 3. query parameters
/// 4. dependencies, in declaration order
/// 5. the background task collector
/// 6. the body
///
/// Scoped dependencies are pushed onto the caller's [`ScopeStack`] as they
/// are acquired, so the caller releases them whatever the outcome.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tessera_core::{PathTemplate, Request, ScopeStack};
/// use tessera_extract::{Binder, BindingPlan, CompileOptions, Param, Signature};
///
/// # tokio_test::block_on(async {
/// let template = PathTemplate::parse("/items/{id}").unwrap();
/// let signature = Signature::new("get_item")
///     .param(Param::typed::<i64>("id"))
///     .param(Param::typed::<String>("q").optional());
/// let plan = BindingPlan::compile(&signature, &template, &CompileOptions::default()).unwrap();
///
/// let request = Request::builder()
///     .uri("/items/42?q=shoe")
///     .path_param("id", "42")
///     .build();
///
/// let mut scope = ScopeStack::new();
/// let args = Binder::new().bind(&plan, &Arc::new(request), &mut scope).await.unwrap();
/// assert_eq!(args.get::<i64>("id").unwrap(), 42);
/// assert_eq!(args.get::<String>("q").unwrap(), "shoe");
/// scope.close().await;
/// # });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Binder {
    max_body_bytes: usize,
}

impl Default for Binder {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Binder {
    /// Creates a binder with the default body limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum accepted body size.
    #[must_use]
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Returns the maximum accepted body size.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Produces the handler's arguments for one request.
    ///
    /// # Errors
    ///
    /// Returns the first [`BindError`] encountered. Teardowns for scoped
    /// dependencies acquired before the failure remain on `scope`.
    #[instrument(
        level = "debug",
        skip_all,
        fields(route = %plan.display_name(), request_id = %request.id())
    )]
    pub async fn bind(
        &self,
        plan: &BindingPlan,
        request: &Arc<Request>,
        scope: &mut ScopeStack,
    ) -> BindResult<BoundArgs> {
        let mut args = BoundArgs::new();

        if plan.wants_request() {
            args.insert(crate::REQUEST_PARAM, BoundValue::Request(Arc::clone(request)));
        }

        for (name, ty) in plan.path_params() {
            let raw = request.path_param(name).unwrap_or_default();
            let value = ty
                .cast(raw)
                .map_err(|e| BindError::invalid_path_param(name, e))?;
            args.insert_scalar(name, value);
        }

        for (name, query) in plan.query_params() {
            match request.query_param(name) {
                Some(raw) => {
                    // Booleans never fail; only a case-insensitive `true` is true.
                    let value = query
                        .ty
                        .cast(raw)
                        .map_err(|e| BindError::invalid_query_param(name, e))?;
                    args.insert_scalar(name, value);
                }
                None if !query.optional => return Err(BindError::missing_query_param(name)),
                None => match &query.default {
                    Some(default) => args.insert_scalar(name, default.clone()),
                    None => args.insert_null(name),
                },
            }
        }

        for (name, dependency) in plan.dependencies() {
            debug!(param = %name, dependency = %dependency.name(), "resolving dependency");
            let value = scope
                .resolve(dependency)
                .await
                .map_err(|e| BindError::from_dependency(name, e))?;
            args.insert(name, BoundValue::Dependency(value));
        }

        if plan.wants_background_tasks() {
            let tasks = BackgroundTasks::new();
            for name in plan.background_task_params() {
                args.insert(name, BoundValue::Tasks(tasks.clone()));
            }
        }

        if let Some(body) = plan.body() {
            if request.body_len() > self.max_body_bytes {
                return Err(BindError::payload_too_large(&body.name, self.max_body_bytes));
            }
            let bytes = request.read_body().await;
            let value = body
                .ty
                .decode(&bytes)
                .map_err(|e| BindError::validation(&body.name, e.to_string()))?;
            args.insert(&body.name, BoundValue::Body(value));
        }

        debug!(bound = args.len(), "request bound");
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::CompileOptions;
    use crate::signature::{Param, Signature};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tessera_core::schema::{JsonSchema, Schema};
    use tessera_core::{BindErrorKind, Dependency, HttpError, PathTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct NewItem {
        name: String,
        price: f64,
    }

    impl JsonSchema for NewItem {
        fn schema_name() -> Option<&'static str> {
            Some("NewItem")
        }
        fn schema() -> Schema {
            Schema::object()
                .required_property("name", Schema::string())
                .required_property("price", Schema::number())
        }
    }

    fn plan(signature: Signature, template: &str) -> BindingPlan {
        let template = PathTemplate::parse(template).unwrap();
        BindingPlan::compile(&signature, &template, &CompileOptions::default()).unwrap()
    }

    fn request(uri: &str) -> Arc<Request> {
        let mut builder = Request::builder().uri(uri);
        let path = uri.split('?').next().unwrap_or_default();
        if let Some(id) = path.strip_prefix("/items/") {
            builder = builder.path_param("id", id);
        }
        Arc::new(builder.build())
    }

    fn items_plan() -> BindingPlan {
        plan(
            Signature::new("get_item")
                .param(Param::typed::<i64>("id"))
                .param(Param::typed::<String>("q").optional()),
            "/items/{id}",
        )
    }

    #[tokio::test]
    async fn test_binds_path_and_query() {
        let mut scope = ScopeStack::new();
        let args = Binder::new()
            .bind(&items_plan(), &request("/items/42?q=shoe"), &mut scope)
            .await
            .unwrap();
        assert_eq!(args.get::<i64>("id").unwrap(), 42);
        assert_eq!(args.get::<String>("q").unwrap(), "shoe");
    }

    #[tokio::test]
    async fn test_absent_optional_query_is_null() {
        let mut scope = ScopeStack::new();
        let args = Binder::new()
            .bind(&items_plan(), &request("/items/7"), &mut scope)
            .await
            .unwrap();
        assert_eq!(args.get_opt::<String>("q").unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_path_param() {
        let mut scope = ScopeStack::new();
        let err = Binder::new()
            .bind(&items_plan(), &request("/items/abc"), &mut scope)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), BindErrorKind::InvalidPathParam);
        assert_eq!(err.param(), Some("id"));
        assert_eq!(err.message(), "Invalid path: id");
    }

    #[tokio::test]
    async fn test_missing_and_invalid_query() {
        let plan = plan(
            Signature::new("list").param(Param::typed::<i64>("limit")),
            "/items",
        );
        let mut scope = ScopeStack::new();

        let err = Binder::new()
            .bind(&plan, &request("/items"), &mut scope)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), BindErrorKind::MissingQueryParam);
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);

        let err = Binder::new()
            .bind(&plan, &request("/items?limit=many"), &mut scope)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), BindErrorKind::InvalidQueryParam);
        assert_eq!(err.message(), "Invalid query: limit");
    }

    #[tokio::test]
    async fn test_query_default_and_boolean_quirk() {
        let plan = plan(
            Signature::new("list")
                .param(Param::typed::<i64>("limit").with_default(10))
                .param(Param::typed::<bool>("verbose")),
            "/items",
        );
        let mut scope = ScopeStack::new();

        let args = Binder::new()
            .bind(&plan, &request("/items?verbose=TRUE"), &mut scope)
            .await
            .unwrap();
        assert_eq!(args.get::<i64>("limit").unwrap(), 10);
        assert!(args.get::<bool>("verbose").unwrap());

        let args = Binder::new()
            .bind(&plan, &request("/items?verbose=yes&limit=3"), &mut scope)
            .await
            .unwrap();
        assert_eq!(args.get::<i64>("limit").unwrap(), 3);
        assert!(!args.get::<bool>("verbose").unwrap());
    }

    #[tokio::test]
    async fn test_decodes_body() {
        let plan = plan(
            Signature::new("create_item").param(Param::body::<NewItem>("item")),
            "/items",
        );
        let request = Arc::new(
            Request::builder()
                .method(http::Method::POST)
                .uri("/items")
                .body(r#"{"name":"shoe","price":9.5}"#)
                .build(),
        );
        let mut scope = ScopeStack::new();
        let args = Binder::new().bind(&plan, &request, &mut scope).await.unwrap();
        assert_eq!(
            args.body::<NewItem>("item").unwrap(),
            &NewItem {
                name: "shoe".into(),
                price: 9.5
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let plan = plan(
            Signature::new("create_item").param(Param::body::<NewItem>("item")),
            "/items",
        );
        let mut scope = ScopeStack::new();
        for body in ["{not json", "", r#"{"name":"shoe"}"#] {
            let request = Arc::new(Request::builder().uri("/items").body(body).build());
            let err = Binder::new()
                .bind(&plan, &request, &mut scope)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), BindErrorKind::ValidationError);
            assert_eq!(err.status_code(), http::StatusCode::UNPROCESSABLE_ENTITY);
            assert!(err.detail().is_some());
        }
    }

    #[tokio::test]
    async fn test_body_limit() {
        let plan = plan(
            Signature::new("create_item").param(Param::body::<NewItem>("item")),
            "/items",
        );
        let request = Arc::new(
            Request::builder()
                .uri("/items")
                .body(r#"{"name":"a very long name","price":1}"#)
                .build(),
        );
        let mut scope = ScopeStack::new();
        let err = Binder::new()
            .with_max_body_bytes(8)
            .bind(&plan, &request, &mut scope)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), BindErrorKind::PayloadTooLarge);
    }

    #[tokio::test]
    async fn test_failed_dependency_keeps_earlier_teardowns() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let session = Dependency::scoped(
            || async { Ok::<_, anyhow::Error>("session") },
            move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>(())
                }
            },
        );
        let denied = Dependency::sync(|| -> anyhow::Result<u8> {
            Err(HttpError::forbidden("no access").into())
        });

        let plan = plan(
            Signature::new("secret")
                .param(Param::depends("session", session))
                .param(Param::depends("user", denied)),
            "/secret",
        );
        let mut scope = ScopeStack::new();
        let err = Binder::new()
            .bind(&plan, &request("/secret"), &mut scope)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), BindErrorKind::Http);
        assert_eq!(err.status_code(), http::StatusCode::FORBIDDEN);
        assert_eq!(err.param(), Some("user"));
        assert_eq!(scope.pending(), 1);
        assert_eq!(scope.close().await, 1);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_injects_request_and_shared_tasks() {
        let plan = plan(
            Signature::new("notify")
                .param(Param::request())
                .param(Param::background_tasks("tasks")),
            "/notify",
        );
        let mut scope = ScopeStack::new();
        let args = Binder::new()
            .bind(&plan, &request("/notify"), &mut scope)
            .await
            .unwrap();

        assert_eq!(args.request().unwrap().path(), "/notify");
        args.background_tasks("tasks").unwrap().add_task(|| Ok(()));
        assert_eq!(args.tasks().unwrap().len(), 1);
    }
}
