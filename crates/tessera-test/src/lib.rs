//! # Tessera Test
//!
//! In-memory testing for Tessera applications: no sockets, no ports.
//!
//! [`TestClient`] wraps a frozen [`Router`](tessera_server::Router). Each
//! request goes through the full compiled route: binding, dependencies,
//! handler, normalization and teardown. After the response is captured the
//! client runs its post-send callback, as a transport would once the
//! response is delivered, and records that it ran.
//!
//! ## Example
//!
//! ```rust,ignore
//! let client = TestClient::new(app.into_router()?);
//!
//! client
//!     .get("/items/42")
//!     .query("q", "shoe")
//!     .send()
//!     .await
//!     .assert_status(StatusCode::OK)
//!     .assert_json_field("q", &json!("shoe"));
//!
//! client
//!     .get("/items/abc")
//!     .send()
//!     .await
//!     .assert_error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid path: id");
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod response;

pub use client::{TestClient, TestRequest};
pub use error::{TestError, TestResult};
pub use response::TestResponse;
