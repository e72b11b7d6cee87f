//! Structured logging.
//!
//! [`init_logging`] installs a global `tracing-subscriber` registry: an
//! [`EnvFilter`] built from [`LogConfig::level`] and one fmt layer in the
//! chosen [`LogOutput`]. Request spans carry `request_id`, `route` and
//! `method`, and record the late-bound names in [`fields`].
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_telemetry::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(route = "read_item", "ready");
//! ```

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Line format of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOutput {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line output for terminals.
    Pretty,
}

/// What [`init_logging`] installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `info,tessera_extract=debug`.
    pub level: String,

    /// Event format.
    pub output: LogOutput,

    /// Emit an event when a span (one per request) opens and closes.
    pub span_events: bool,

    /// Include the source file and line of each event.
    pub source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Pretty output at `debug`, with span events and source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            output: LogOutput::Pretty,
            span_events: true,
            source_location: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Json,
            span_events: false,
            source_location: false,
        }
    }

    /// Replaces the filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the directive does not parse or
/// a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = create_env_filter(&config.level)?;
    let spans = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let location = config.source_location;

    let layer = match config.output {
        LogOutput::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_events(spans)
            .with_file(location)
            .with_line_number(location)
            .boxed(),
        LogOutput::Pretty => fmt::layer()
            .pretty()
            .with_span_events(spans)
            .with_file(location)
            .with_line_number(location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Parses a filter directive.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the directive is invalid.
pub fn create_env_filter(directive: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| TelemetryError::LoggingInit(format!("bad filter `{directive}`: {e}")))
}

/// Request span fields recorded once the response is known.
///
/// The request span declares them empty; `tessera-server` fills them in
/// with [`Span::record`](tracing::Span::record).
pub mod fields {
    /// Response status code.
    pub const STATUS: &str = "status";

    /// Elapsed time in milliseconds.
    pub const DURATION_MS: &str = "duration_ms";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let production = LogConfig::default();
        assert_eq!(production.output, LogOutput::Json);
        assert_eq!(production.level, "info");
        assert!(!production.span_events);

        let development = LogConfig::development();
        assert_eq!(development.output, LogOutput::Pretty);
        assert!(development.source_location);
    }

    #[test]
    fn test_with_level() {
        let config = LogConfig::production().with_level("warn,tessera_extract=trace");
        assert_eq!(config.level, "warn,tessera_extract=trace");
        assert!(create_env_filter(&config.level).is_ok());
    }

    #[test]
    fn test_bad_directive() {
        let err = create_env_filter("tessera=loud").unwrap_err();
        assert!(err.to_string().contains("tessera=loud"));
    }

    #[test]
    fn test_request_span_fields_are_recordable() {
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let span = tracing::info_span!(
                "request",
                status = tracing::field::Empty,
                duration_ms = tracing::field::Empty,
            );
            assert!(span.field(fields::STATUS).is_some());
            assert!(span.field(fields::DURATION_MS).is_some());
            span.record(fields::STATUS, 200_u16);
        });
    }

    #[test]
    fn test_bad_directive_fails_before_install() {
        let config = LogConfig::production().with_level("tessera=loud");
        assert!(matches!(
            init_logging(&config),
            Err(TelemetryError::LoggingInit(_))
        ));
    }
}
