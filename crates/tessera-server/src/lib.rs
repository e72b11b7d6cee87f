//! # Tessera Server
//!
//! Route registration and request execution.
//!
//! - [`App`] - the route registry; compiles signatures at registration
//! - [`normalize`] / [`IntoReply`] - handler return values to responses
//! - [`Transport`] / [`CompiledHandler`] - the seam to whatever delivers requests
//! - [`Router`] - the in-memory transport used by tests and embedders
//!
//! ## Request lifecycle
//!
//! ```text
//! Request ─▶ Router ─▶ bind ─▶ handler ─▶ normalize ─▶ teardown ─▶ Response
//!                                                                   │
//!                                     transport delivers, then runs post-send
//! ```
//!
//! Scoped dependencies are always torn down before the response leaves the
//! compiled handler, on success and on every failure path.

#![doc(html_root_url = "https://docs.rs/tessera-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
pub mod normalize;
mod router;
mod transport;

pub use app::{App, DEFAULT_OPENAPI_URL};
pub use normalize::{normalize, IntoReply, Reply};
pub use router::Router;
pub use transport::{CompiledHandler, Transport};
