//! # Tessera Extract
//!
//! Handler signature classification and request binding.
//!
//! A handler declares its parameters once as a [`Signature`]. At
//! registration, [`BindingPlan::compile`] classifies every parameter into
//! one of six roles:
//!
//! | Role | Declared as | Bound from |
//! |------|-------------|------------|
//! | request | a parameter named `request` | the raw [`Request`](tessera_core::Request) |
//! | dependency | [`Param::depends`] | a [`Dependency`](tessera_core::Dependency) resolved per request |
//! | body | [`Param::body`] | the JSON payload |
//! | path | a name matching a template placeholder | the path segment |
//! | query | [`Param::typed`] / [`Param::scalar`] | the query string |
//! | background tasks | [`Param::background_tasks`] | a fresh collector |
//!
//! At request time, [`Binder::bind`] walks the plan and produces
//! [`BoundArgs`] or the first [`BindError`](tessera_core::BindError).
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::PathTemplate;
//! use tessera_extract::{BindingPlan, CompileOptions, Param, Signature};
//!
//! let template = PathTemplate::parse("/users/{user_id}").unwrap();
//! let signature = Signature::new("get_user")
//!     .param(Param::typed::<i64>("user_id"))
//!     .param(Param::typed::<bool>("verbose").with_default(false));
//!
//! let plan = BindingPlan::compile(&signature, &template, &CompileOptions::default()).unwrap();
//! assert!(plan.path_params().contains_key("user_id"));
//! assert!(!plan.query_params()["verbose"].required());
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod args;
mod binder;
mod plan;
mod signature;

pub use args::{ArgError, ArgResult, BoundArgs, BoundValue};
pub use binder::{Binder, DEFAULT_MAX_BODY_BYTES};
pub use plan::{BindingPlan, BodyParam, CompileOptions, QueryParam};
pub use signature::{
    Annotation, BodyType, BodyValue, Param, ParamDefault, Signature, REQUEST_PARAM,
};
