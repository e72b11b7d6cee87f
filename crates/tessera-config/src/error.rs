//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// A configuration source could not be applied, or the merged result is
/// unusable.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The named file does not exist.
    #[error("no configuration at {path}")]
    Missing {
        /// Path that was requested.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read {path}")]
    Io {
        /// Path that was requested.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// TOML source did not deserialize into [`TesseraConfig`](crate::TesseraConfig).
    #[error("bad TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON source did not deserialize into [`TesseraConfig`](crate::TesseraConfig).
    #[error("bad JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value that [`validate`](crate::TesseraConfig::validate) rejects.
    #[error("{field}: {reason}")]
    Invalid {
        /// Dotted field path, e.g. `docs.openapi_url`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An environment override could not be parsed.
    #[error("{var}: {reason}")]
    Env {
        /// Full variable name.
        var: String,
        /// What was expected.
        reason: String,
    },

    /// The source is neither `toml` nor `json`.
    #[error("unknown configuration format `{0}`")]
    UnknownFormat(String),
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub(crate) fn missing(path: impl Into<PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// A field failed validation.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
