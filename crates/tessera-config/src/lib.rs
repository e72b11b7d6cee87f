//! Configuration for Tessera applications.
//!
//! [`TesseraConfig`] groups the settings an application exposes:
//!
//! - `[app]`: title and version for the generated document
//! - `[docs]`: whether and where the document is served
//! - `[binding]`: signature strictness and the request body limit
//! - `[logging]`: log level and output format
//!
//! [`ConfigLoader`] layers defaults, files, and environment variables.
//!
//! ```toml
//! [app]
//! title = "Inventory"
//!
//! [docs]
//! openapi_url = "/openapi.json"
//!
//! [binding]
//! strict_signatures = true
//! max_body_bytes = 65536
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::TesseraConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use schema::{AppSection, BindingSection, DocsSection, LogFormat, LoggingSection};
