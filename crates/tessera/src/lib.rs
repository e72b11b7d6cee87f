//! # Tessera
//!
//! Declarative request binding and dependency resolution for async Rust
//! services.
//!
//! A handler is registered with a [`Signature`](extract::Signature) that
//! names its parameters. At registration the signature is compiled into a
//! binding plan. At request time the plan drives binding:
//!
//! - path parameters and query values, cast to their scalar types
//! - JSON bodies, decoded into typed structs
//! - dependencies: sync, async, or scoped with guaranteed teardown
//! - a background task collector that runs after the response is sent
//!
//! The same plans produce an OpenAPI document.
//!
//! ## Quick Start
//!
//! ```rust
//! use tessera::prelude::*;
//! use serde_json::json;
//!
//! let mut app = App::new().title("Inventory");
//! app.get(
//!     "/items/{id}",
//!     Signature::new("read_item")
//!         .param(Param::typed::<i64>("id"))
//!         .param(Param::scalar("q", ScalarType::String).optional()),
//!     |args: BoundArgs| async move {
//!         Ok(json!({ "id": args.get::<i64>("id")?, "q": args.get_opt::<String>("q")? }))
//!     },
//! )?;
//!
//! let document = app.openapi()?;
//! assert!(document.paths.contains_key("/items/{id}"));
//! let router = app.into_router()?;
//! assert_eq!(router.route_count(), 2);
//! # Ok::<(), ConfigurationError>(())
//! ```
//!
//! ## Crates
//!
//! | Module | Crate | Role |
//! |--------|-------|------|
//! | [`core`] | `tessera-core` | Request, response, scalars, schemas, dependencies, errors |
//! | [`extract`] | `tessera-extract` | Signature classification and request binding |
//! | [`tasks`] | `tessera-tasks` | Background task collection |
//! | [`docs`] | `tessera-docs` | OpenAPI generation |
//! | [`server`] | `tessera-server` | Route registry, normalization, in-memory router |
//! | [`config`] | `tessera-config` | Layered configuration |
//! | [`telemetry`] | `tessera-telemetry` | Logging and metrics |

#![doc(html_root_url = "https://docs.rs/tessera/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use tessera_config as config;
pub use tessera_core as core;
pub use tessera_docs as docs;
pub use tessera_extract as extract;
pub use tessera_server as server;
pub use tessera_tasks as tasks;
pub use tessera_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    pub use tessera_core::schema::{Definitions, JsonSchema, Schema};
    pub use tessera_core::{
        BindError, BindErrorKind, ConfigurationError, Dependency, HttpError, Json, PostSend,
        Request, Response, ScalarType, ScalarValue,
    };

    pub use tessera_extract::{Annotation, BoundArgs, Param, Signature};

    pub use tessera_tasks::BackgroundTasks;

    pub use tessera_docs::OpenApi;

    pub use tessera_server::{App, IntoReply, Reply, Router, Transport};

    pub use tessera_config::{ConfigLoader, TesseraConfig};
}
