//! # Tessera Docs
//!
//! OpenAPI document generation for the Tessera framework.
//!
//! The document is derived from the same [`BindingPlan`](tessera_extract::BindingPlan)s
//! the binder uses, so what is documented is exactly what is bound:
//!
//! - path parameters are always required
//! - query parameters are required unless they have a default
//! - a body parameter becomes a required JSON `requestBody`, with named
//!   types collected under `components.schemas`
//!
//! Serving the document is left to `tessera-server`, which mounts it at the
//! configured `openapi_url` and keeps that route out of the document itself.

#![doc(html_root_url = "https://docs.rs/tessera-docs/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod generator;
mod openapi;

pub use error::{DocsError, DocsResult};
pub use generator::{OpenApiGenerator, RouteDoc, DEFAULT_OPENAPI_VERSION};
pub use openapi::{
    Components, Info, MediaType, OpenApi, Operation, Parameter, ParameterIn, PathItem,
    RequestBody, Response,
};
