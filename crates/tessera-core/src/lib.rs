//! # Tessera Core
//!
//! Core types shared by every Tessera crate.
//!
//! - [`Request`] / [`RequestId`] - the request abstraction handed to the binder
//! - [`Response`] / [`PostSend`] - the response envelope produced for the transport
//! - [`ScalarType`] / [`ScalarValue`] - the four scalar parameter types and their casting rules
//! - [`PathTemplate`] - route templates and placeholder extraction
//! - [`Schema`] / [`JsonSchema`] - structural schemas for request bodies
//! - [`Dependency`] / [`ScopeStack`] - dependency descriptors and scoped teardown
//! - [`ConfigurationError`] / [`BindError`] / [`HttpError`] - the error taxonomy

#![doc(html_root_url = "https://docs.rs/tessera-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod di;
mod error;
mod params;
mod request;
mod response;
mod scalar;
pub mod schema;
mod template;

pub use di::{Dependency, DependencyKind, DependencyValue, Resolved, ScopeStack, Teardown};
pub use error::{BindError, BindErrorKind, BindResult, ConfigurationError, HttpError};
pub use params::Params;
pub use request::{Request, RequestBuilder, RequestId};
pub use response::{Json, PostSend, Response};
pub use scalar::{CastError, Scalar, ScalarType, ScalarValue};
pub use schema::{Definitions, JsonSchema, Schema};
pub use template::PathTemplate;
