//! Observability for Tessera services.
//!
//! - **Logging**: structured JSON or pretty output via `tracing-subscriber`
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//!
//! Both are opt-in. Libraries in this workspace only emit `tracing` events
//! and `metrics` calls; nothing is recorded until the application installs
//! a subscriber and a recorder.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_telemetry::logging::{init_logging, LogConfig};
//! use tessera_telemetry::metrics::{init_metrics, MetricsConfig};
//!
//! init_logging(&LogConfig::production())?;
//! init_metrics(&MetricsConfig::default())?;
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogConfig, LogOutput};
pub use metrics::{init_metrics, install_recorder, render_metrics, MetricsConfig};
