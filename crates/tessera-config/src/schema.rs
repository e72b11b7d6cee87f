//! Configuration section types.

use serde::{Deserialize, Serialize};
use tessera_telemetry::LogConfig;

/// Application metadata, used for the document's `info` block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    /// API title.
    #[serde(default = "default_title")]
    pub title: String,

    /// API version.
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            version: default_version(),
        }
    }
}

fn default_title() -> String {
    "Tessera".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Documentation endpoint and generator settings.
///
/// # Example
///
/// ```
/// use tessera_config::DocsSection;
///
/// let docs = DocsSection::default();
/// assert!(docs.enabled);
/// assert_eq!(docs.openapi_url, "/openapi.json");
/// assert_eq!(docs.openapi_version, "3.0.3");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocsSection {
    /// Whether the document is served.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path the document is served at.
    #[serde(default = "default_openapi_url")]
    pub openapi_url: String,

    /// Value of the document's `openapi` field.
    #[serde(default = "default_openapi_version")]
    pub openapi_version: String,

    /// Fail registration when two routes define a component differently.
    #[serde(default)]
    pub strict_schema_names: bool,
}

impl Default for DocsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            openapi_url: default_openapi_url(),
            openapi_version: default_openapi_version(),
            strict_schema_names: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_openapi_url() -> String {
    "/openapi.json".to_string()
}

fn default_openapi_version() -> String {
    "3.0.3".to_string()
}

/// Request binding settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BindingSection {
    /// Reject handler parameters that match no binding rule.
    #[serde(default)]
    pub strict_signatures: bool,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for BindingSection {
    fn default() -> Self {
        Self {
            strict_signatures: false,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, human-readable.
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Filter directive, e.g. `info` or `tessera_server=debug`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::Json,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl LoggingSection {
    /// Converts the section into a telemetry [`LogConfig`].
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        let base = match self.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        base.with_level(self.level.clone())
    }
}
