//! The route registry.
//!
//! An [`App`] collects routes during startup. Each registration compiles the
//! handler's [`Signature`] into a [`BindingPlan`] once; configuration errors
//! surface there, never at request time. [`App::into_router`] freezes the
//! registry, wraps every handler into a [`CompiledHandler`] and hands it to
//! a [`Transport`].

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::Method;
use tessera_config::TesseraConfig;
use tessera_core::{BindError, BindResult, ConfigurationError, PathTemplate, Request, Response, ScopeStack};
use tessera_docs::{OpenApi, OpenApiGenerator, RouteDoc};
use tessera_extract::{Binder, BindingPlan, BoundArgs, CompileOptions, Signature};
use tessera_telemetry::logging::fields;
use tessera_telemetry::metrics::{record_bind_failure, record_request};
use tracing::{debug, error, field, info, info_span, Instrument, Span};

use crate::normalize::{normalize, IntoReply, Reply};
use crate::router::Router;
use crate::transport::{CompiledHandler, Transport};

/// Default path of the served OpenAPI document.
pub const DEFAULT_OPENAPI_URL: &str = "/openapi.json";

type HandlerFn = Arc<dyn Fn(BoundArgs) -> BoxFuture<'static, anyhow::Result<Reply>> + Send + Sync>;

struct RouteEntry {
    method: Method,
    path: String,
    plan: Arc<BindingPlan>,
    handler: HandlerFn,
}

/// Application builder and route registry.
///
/// # Example
///
/// ```rust
/// use http::StatusCode;
/// use serde_json::json;
/// use tessera_core::{Request, ScalarType};
/// use tessera_extract::{BoundArgs, Param, Signature};
/// use tessera_server::App;
///
/// # tokio_test::block_on(async {
/// let mut app = App::new();
/// app.get(
///     "/items/{id}",
///     Signature::new("read_item")
///         .param(Param::typed::<i64>("id"))
///         .param(Param::scalar("q", ScalarType::String).optional()),
///     |args: BoundArgs| async move {
///         Ok(json!({ "id": args.get::<i64>("id")?, "q": args.get_opt::<String>("q")? }))
///     },
/// )?;
///
/// let router = app.into_router()?;
/// let response = router
///     .dispatch(Request::builder().uri("/items/42?q=shoe").build())
///     .await;
/// assert_eq!(response.status(), StatusCode::OK);
/// assert_eq!(response.body(), &json!({ "id": 42, "q": "shoe" }));
/// # Ok::<(), tessera_core::ConfigurationError>(())
/// # }).unwrap();
/// ```
pub struct App {
    routes: Vec<RouteEntry>,
    options: CompileOptions,
    binder: Binder,
    generator: OpenApiGenerator,
    docs_enabled: bool,
    openapi_url: String,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Creates an app with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            options: CompileOptions::default(),
            binder: Binder::new(),
            generator: OpenApiGenerator::new(),
            docs_enabled: true,
            openapi_url: DEFAULT_OPENAPI_URL.to_string(),
        }
    }

    /// Creates an app from loaded configuration.
    #[must_use]
    pub fn from_config(config: &TesseraConfig) -> Self {
        Self {
            routes: Vec::new(),
            options: CompileOptions {
                strict_signatures: config.binding.strict_signatures,
            },
            binder: Binder::new().with_max_body_bytes(config.binding.max_body_bytes),
            generator: OpenApiGenerator::new()
                .title(&config.app.title)
                .version(&config.app.version)
                .openapi_version(&config.docs.openapi_version)
                .strict_schema_names(config.docs.strict_schema_names),
            docs_enabled: config.docs.enabled,
            openapi_url: config.docs.openapi_url.clone(),
        }
    }

    /// Sets the document title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.generator = self.generator.title(title);
        self
    }

    /// Sets the document version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.generator = self.generator.version(version);
        self
    }

    /// Rejects parameters that match no binding rule.
    #[must_use]
    pub fn strict_signatures(mut self, strict: bool) -> Self {
        self.options.strict_signatures = strict;
        self
    }

    /// Rejects conflicting schema component definitions.
    #[must_use]
    pub fn strict_schema_names(mut self, strict: bool) -> Self {
        self.generator = self.generator.strict_schema_names(strict);
        self
    }

    /// Sets the request body limit.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.binder = self.binder.with_max_body_bytes(limit);
        self
    }

    /// Serves the document at `url`, or disables it with `None`.
    #[must_use]
    pub fn openapi_url(mut self, url: Option<&str>) -> Self {
        match url {
            Some(url) => {
                self.docs_enabled = true;
                self.openapi_url = url.to_string();
            }
            None => self.docs_enabled = false,
        }
        self
    }

    /// Number of registered routes, the document route excluded.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Registers a handler.
    ///
    /// The signature is compiled against the path template here. The
    /// handler receives the [`BoundArgs`] and returns anything implementing
    /// [`IntoReply`]; errors it returns become 500 responses unless they
    /// carry an [`HttpError`](tessera_core::HttpError).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the template is invalid, the
    /// route is already registered, the signature does not compile, or
    /// strict schema names are enabled and the body schema conflicts.
    pub fn route<F, Fut, R>(
        &mut self,
        method: Method,
        path: &str,
        signature: Signature,
        handler: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: IntoReply + Send + 'static,
    {
        let template = PathTemplate::parse(path)?;
        if self
            .routes
            .iter()
            .any(|r| r.method == method && r.path == template.as_str())
        {
            return Err(ConfigurationError::DuplicateRoute {
                method: method.to_string(),
                path: path.to_string(),
            });
        }

        let plan = Arc::new(BindingPlan::compile(&signature, &template, &self.options)?);

        if self.generator.is_strict() {
            let existing = self.routes.iter().map(|r| RouteDoc {
                method: &r.method,
                path: &r.path,
                plan: Some(r.plan.as_ref()),
            });
            let candidate = RouteDoc {
                method: &method,
                path: template.as_str(),
                plan: Some(plan.as_ref()),
            };
            self.generator
                .generate(existing.chain(std::iter::once(candidate)))?;
        }

        let handler: HandlerFn = Arc::new(move |args: BoundArgs| {
            let fut = handler(args);
            async move {
                let reply = fut.await?.into_reply()?;
                Ok::<_, anyhow::Error>(reply)
            }
            .boxed()
        });

        info!(
            method = %method,
            path = %path,
            route = %plan.display_name(),
            "route registered"
        );

        self.routes.push(RouteEntry {
            method,
            path: template.as_str().to_string(),
            plan,
            handler,
        });
        Ok(self)
    }

    /// Registers a GET handler. See [`route`](Self::route).
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn get<F, Fut, R>(
        &mut self,
        path: &str,
        signature: Signature,
        handler: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: IntoReply + Send + 'static,
    {
        self.route(Method::GET, path, signature, handler)
    }

    /// Registers a POST handler. See [`route`](Self::route).
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn post<F, Fut, R>(
        &mut self,
        path: &str,
        signature: Signature,
        handler: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: IntoReply + Send + 'static,
    {
        self.route(Method::POST, path, signature, handler)
    }

    /// Registers a PUT handler. See [`route`](Self::route).
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn put<F, Fut, R>(
        &mut self,
        path: &str,
        signature: Signature,
        handler: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: IntoReply + Send + 'static,
    {
        self.route(Method::PUT, path, signature, handler)
    }

    /// Registers a PATCH handler. See [`route`](Self::route).
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn patch<F, Fut, R>(
        &mut self,
        path: &str,
        signature: Signature,
        handler: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: IntoReply + Send + 'static,
    {
        self.route(Method::PATCH, path, signature, handler)
    }

    /// Registers a DELETE handler. See [`route`](Self::route).
    ///
    /// # Errors
    ///
    /// See [`route`](Self::route).
    pub fn delete<F, Fut, R>(
        &mut self,
        path: &str,
        signature: Signature,
        handler: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: IntoReply + Send + 'static,
    {
        self.route(Method::DELETE, path, signature, handler)
    }

    /// Generates the OpenAPI document for the registered routes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::SchemaConflict`] when strict schema
    /// names are enabled and two routes disagree on a component.
    pub fn openapi(&self) -> Result<OpenApi, ConfigurationError> {
        self.generator.generate(self.routes.iter().map(|r| RouteDoc {
            method: &r.method,
            path: &r.path,
            plan: Some(r.plan.as_ref()),
        }))
    }

    /// Freezes the registry into an in-memory [`Router`].
    ///
    /// # Errors
    ///
    /// See [`register_into`](Self::register_into).
    pub fn into_router(self) -> Result<Router, ConfigurationError> {
        let mut router = Router::new();
        self.register_into(&mut router)?;
        Ok(router)
    }

    /// Freezes the registry and registers every route with `transport`.
    ///
    /// When docs are enabled the document is generated once here and
    /// served, undocumented, at the configured URL.
    ///
    /// # Errors
    ///
    /// Returns the first error the transport reports, or a schema conflict
    /// from generating the document.
    pub fn register_into<T: Transport>(self, transport: &mut T) -> Result<(), ConfigurationError> {
        let document = if self.docs_enabled {
            Some(Arc::new(self.openapi()?))
        } else {
            None
        };

        for entry in &self.routes {
            transport.register(&entry.path, entry.method.clone(), self.compile(entry))?;
        }

        if let Some(document) = document {
            transport.register(&self.openapi_url, Method::GET, serve_document(document))?;
            debug!(url = %self.openapi_url, "serving OpenAPI document");
        }

        Ok(())
    }

    fn compile(&self, entry: &RouteEntry) -> CompiledHandler {
        let plan = Arc::clone(&entry.plan);
        let handler = Arc::clone(&entry.handler);
        let binder = self.binder;

        Arc::new(move |request: Request| {
            let plan = Arc::clone(&plan);
            let handler = Arc::clone(&handler);
            let span = info_span!(
                "request",
                request_id = %request.id(),
                route = %plan.display_name(),
                method = %request.method(),
                status = field::Empty,
                duration_ms = field::Empty,
            );
            async move { execute(binder, &plan, &handler, request).await }
                .instrument(span)
                .boxed()
        })
    }
}

/// Runs one request through bind, handler, normalize and teardown.
async fn execute(
    binder: Binder,
    plan: &BindingPlan,
    handler: &HandlerFn,
    request: Request,
) -> Response {
    let started = Instant::now();
    let request = Arc::new(request);
    let mut scope = ScopeStack::new();

    let outcome = AssertUnwindSafe(invoke(binder, plan, handler, &request, &mut scope))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            Err(BindError::from_handler(anyhow::anyhow!(
                "handler panicked: {}",
                panic_message(payload.as_ref())
            )))
        });
    let released = scope.close().await;
    if released > 0 {
        debug!(released, "scoped dependencies released");
    }

    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            if err.is_client_error() {
                debug!(kind = %err.kind(), param = err.param(), error = %err, "request rejected");
            } else {
                error!(kind = %err.kind(), error = ?err, "request failed");
            }
            record_bind_failure(err.kind());
            err.into_response()
        }
    };

    let elapsed = started.elapsed();
    let span = Span::current();
    span.record(fields::STATUS, response.status().as_u16());
    span.record(fields::DURATION_MS, elapsed.as_secs_f64() * 1000.0);
    record_request(plan.display_name(), response.status().as_u16(), elapsed);
    response
}

async fn invoke(
    binder: Binder,
    plan: &BindingPlan,
    handler: &HandlerFn,
    request: &Arc<Request>,
    scope: &mut ScopeStack,
) -> BindResult<Response> {
    let args = binder.bind(plan, request, scope).await?;
    let tasks = args.tasks().cloned();
    let reply = handler(args).await.map_err(BindError::from_handler)?;
    Ok(normalize(reply, tasks.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn serve_document(document: Arc<OpenApi>) -> CompiledHandler {
    Arc::new(move |_request: Request| {
        let document = Arc::clone(&document);
        async move {
            match document.to_value() {
                Ok(body) => Response::new(body),
                Err(e) => {
                    error!(error = %e, "OpenAPI document failed to render");
                    BindError::from_handler(e.into()).into_response()
                }
            }
        }
        .boxed()
    })
}
