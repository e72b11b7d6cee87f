//! Error taxonomy.
//!
//! Two families of errors exist:
//!
//! - [`ConfigurationError`] is raised while routes are registered. It is
//!   fatal and never reaches a request.
//! - [`BindError`] is raised while a request is bound or handled. Every
//!   `BindError` maps onto a status code and a JSON error body, so a failed
//!   request is still answered.
//!
//! Handlers and dependencies may also return an [`HttpError`] through
//! `anyhow`; it is recognised and mapped onto its own status.

use crate::response::Response;
use crate::scalar::CastError;
use http::StatusCode;
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Result type for request binding.
pub type BindResult<T> = Result<T, BindError>;

/// A route could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// More than one parameter was declared as the request body.
    #[error("route {route}: parameter `{second}` declares a second request body (`{first}` already does)")]
    DuplicateBody {
        /// Route display name.
        route: String,
        /// The body parameter that was accepted.
        first: String,
        /// The rejected body parameter.
        second: String,
    },

    /// The path parameters do not match the template placeholders.
    #[error(
        "route {route}: path parameters do not match the template (missing: {missing:?}, unexpected: {unexpected:?})"
    )]
    PathParamMismatch {
        /// Route display name.
        route: String,
        /// Placeholders with no path parameter.
        missing: Vec<String>,
        /// Path parameters with no placeholder.
        unexpected: Vec<String>,
    },

    /// A path parameter was annotated with a non-scalar type.
    #[error("route {route}: path parameter `{param}` must be declared with a scalar type")]
    UnsupportedPathType {
        /// Route display name.
        route: String,
        /// Parameter name.
        param: String,
    },

    /// Two parameters share a name.
    #[error("route {route}: parameter `{param}` is declared twice")]
    DuplicateParameter {
        /// Route display name.
        route: String,
        /// Parameter name.
        param: String,
    },

    /// A parameter matched no binding rule and strict signatures are enabled.
    #[error("route {route}: parameter `{param}` matches no binding rule")]
    UnboundParameter {
        /// Route display name.
        route: String,
        /// Parameter name.
        param: String,
    },

    /// A declared default does not fit the parameter type.
    #[error("route {route}: default for `{param}` is not a valid {expected}")]
    InvalidDefault {
        /// Route display name.
        route: String,
        /// Parameter name.
        param: String,
        /// The declared parameter type.
        expected: String,
    },

    /// The route template could not be parsed.
    #[error("invalid path template `{template}`: {reason}")]
    InvalidTemplate {
        /// The template text.
        template: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The same method and path were registered twice.
    #[error("route {method} {path} is already registered")]
    DuplicateRoute {
        /// HTTP method.
        method: String,
        /// Path template.
        path: String,
    },

    /// Two routes define different schemas under the same component name.
    #[error("schema component `{name}` is defined differently by route {route}")]
    SchemaConflict {
        /// Component name.
        name: String,
        /// The route whose definition conflicts.
        route: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid template error.
    pub fn invalid_template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }
}

/// Classification of a request-time failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindErrorKind {
    /// A path segment could not be cast to its declared type.
    InvalidPathParam,
    /// A query value could not be cast to its declared type.
    InvalidQueryParam,
    /// A required query value was absent.
    MissingQueryParam,
    /// The request body failed to decode.
    ValidationError,
    /// The request body exceeded the configured limit.
    PayloadTooLarge,
    /// A handler or dependency raised an explicit [`HttpError`].
    Http,
    /// Any other failure escaping a handler or dependency.
    HandlerError,
}

impl BindErrorKind {
    /// Returns a stable snake_case label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPathParam => "invalid_path_param",
            Self::InvalidQueryParam => "invalid_query_param",
            Self::MissingQueryParam => "missing_query_param",
            Self::ValidationError => "validation_error",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Http => "http",
            Self::HandlerError => "handler_error",
        }
    }
}

impl fmt::Display for BindErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request-time failure.
///
/// # Example
///
/// ```rust
/// use tessera_core::{BindError, BindErrorKind};
/// use http::StatusCode;
///
/// let err = BindError::missing_query_param("limit");
/// assert_eq!(err.kind(), BindErrorKind::MissingQueryParam);
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.body()["error"], "Missing query: limit");
/// ```
#[derive(Debug)]
pub struct BindError {
    kind: BindErrorKind,
    status: StatusCode,
    param: Option<String>,
    message: String,
    detail: Option<String>,
    source: Option<anyhow::Error>,
}

impl BindError {
    fn new(kind: BindErrorKind, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            param: None,
            message: message.into(),
            detail: None,
            source: None,
        }
    }

    fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// A path segment failed to cast.
    pub fn invalid_path_param(param: impl Into<String>, cause: CastError) -> Self {
        let param = param.into();
        let mut err = Self::new(
            BindErrorKind::InvalidPathParam,
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Invalid path: {param}"),
        )
        .with_param(param);
        err.detail = Some(cause.to_string());
        err
    }

    /// A query value failed to cast.
    pub fn invalid_query_param(param: impl Into<String>, cause: CastError) -> Self {
        let param = param.into();
        let mut err = Self::new(
            BindErrorKind::InvalidQueryParam,
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Invalid query: {param}"),
        )
        .with_param(param);
        err.detail = Some(cause.to_string());
        err
    }

    /// A required query value was absent.
    pub fn missing_query_param(param: impl Into<String>) -> Self {
        let param = param.into();
        Self::new(
            BindErrorKind::MissingQueryParam,
            StatusCode::BAD_REQUEST,
            format!("Missing query: {param}"),
        )
        .with_param(param)
    }

    /// The body failed to decode into its declared type.
    pub fn validation(param: impl Into<String>, detail: impl Into<String>) -> Self {
        let mut err = Self::new(
            BindErrorKind::ValidationError,
            StatusCode::UNPROCESSABLE_ENTITY,
            "Validation Error",
        )
        .with_param(param);
        err.detail = Some(detail.into());
        err
    }

    /// The body exceeded `limit` bytes.
    pub fn payload_too_large(param: impl Into<String>, limit: usize) -> Self {
        let param = param.into();
        let mut err = Self::new(
            BindErrorKind::PayloadTooLarge,
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Payload too large: {param}"),
        )
        .with_param(param);
        err.detail = Some(format!("body exceeds {limit} bytes"));
        err
    }

    /// Classifies an error raised by a handler or dependency.
    ///
    /// An [`HttpError`] anywhere in the chain keeps its status and detail.
    /// Everything else becomes an opaque internal error.
    pub fn from_handler(err: anyhow::Error) -> Self {
        if let Some(http) = err.chain().find_map(|e| e.downcast_ref::<HttpError>()) {
            let mut mapped = Self::new(BindErrorKind::Http, http.status(), http.detail());
            mapped.source = Some(err);
            return mapped;
        }
        let mut mapped = Self::new(
            BindErrorKind::HandlerError,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
        );
        mapped.source = Some(err);
        mapped
    }

    /// Like [`from_handler`](Self::from_handler), naming the dependency parameter that failed.
    pub fn from_dependency(param: impl Into<String>, err: anyhow::Error) -> Self {
        Self::from_handler(err).with_param(param)
    }

    /// Returns the failure kind.
    #[must_use]
    pub fn kind(&self) -> BindErrorKind {
        self.kind
    }

    /// Returns the offending parameter, if any.
    #[must_use]
    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    /// Returns the client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the detail string, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the HTTP status this error maps onto.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Returns true if the failure is the client's fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Builds the JSON error body.
    ///
    /// Validation failures carry a `detail` field. Internal errors never
    /// expose their cause.
    #[must_use]
    pub fn body(&self) -> serde_json::Value {
        match (self.kind, &self.detail) {
            (BindErrorKind::ValidationError, Some(detail)) => {
                json!({ "error": self.message, "detail": detail })
            }
            _ => json!({ "error": self.message }),
        }
    }

    /// Converts the error into a response envelope.
    #[must_use]
    pub fn into_response(self) -> Response {
        Response::json(self.status, self.body())
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.detail, &self.source) {
            (Some(detail), _) => write!(f, "{}: {detail}", self.message),
            (None, Some(source)) => write!(f, "{}: {source:#}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// An explicit HTTP failure raised from handler or dependency code.
///
/// # Example
///
/// ```rust
/// use tessera_core::HttpError;
///
/// fn load(id: i64) -> anyhow::Result<String> {
///     if id != 1 {
///         return Err(HttpError::not_found("Item not found").into());
///     }
///     Ok("widget".to_string())
/// }
///
/// assert!(load(2).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {detail}")]
pub struct HttpError {
    status: StatusCode,
    detail: String,
}

impl HttpError {
    /// Creates an error with an explicit status.
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    /// 403 Forbidden.
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, detail)
    }

    /// 404 Not Found.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    /// Returns the status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the detail message.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}
