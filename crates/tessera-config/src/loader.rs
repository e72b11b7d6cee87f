//! Layered configuration loading.
//!
//! Sources apply in the order they are added, and environment variables
//! apply last:
//!
//! 1. Defaults (or a preset)
//! 2. Configuration files (TOML or JSON)
//! 3. Environment variables (`PREFIX__SECTION__FIELD`)

use std::env;
use std::path::Path;

use crate::{ConfigError, ConfigResult, LogFormat, TesseraConfig};

/// Builder that layers configuration sources into a [`TesseraConfig`].
///
/// # Example
///
/// ```no_run
/// use tessera_config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_file("tessera.toml")?
///     .with_env_prefix("TESSERA")
///     .load()?;
/// # Ok::<(), tessera_config::ConfigError>(())
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: TesseraConfig,
    env_prefix: Option<String>,
    file_loaded: bool,
}

impl ConfigLoader {
    /// Creates a loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = TesseraConfig::default();
        self
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = TesseraConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = TesseraConfig::production();
        self
    }

    /// Loads a file, choosing the parser by extension.
    ///
    /// The file is layered over the current configuration: fields it sets
    /// replace the current values, and fields it omits keep them, so a
    /// preset applied earlier survives.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, has an unknown
    /// extension, or does not parse.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::missing(path));
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        self.config = layer(&self.config, &content, &format)?;
        self.file_loaded = true;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Layers configuration from a string in `format` (`toml` or `json`),
    /// the same way as [`with_file`](Self::with_file).
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown format or unparsable content.
    pub fn with_string(mut self, content: &str, format: &str) -> ConfigResult<Self> {
        self.config = layer(&self.config, content, &format.to_ascii_lowercase())?;
        self.file_loaded = true;
        Ok(self)
    }

    /// Enables overrides from variables named `PREFIX__SECTION__FIELD`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into().to_uppercase());
        self
    }

    /// Whether a file or string source was applied.
    #[must_use]
    pub fn file_loaded(&self) -> bool {
        self.file_loaded
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns an error if an override does not parse or validation fails.
    pub fn load(self) -> ConfigResult<TesseraConfig> {
        let config = self.load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides without validating.
    ///
    /// # Errors
    ///
    /// Returns an error if an override does not parse.
    pub fn load_unvalidated(mut self) -> ConfigResult<TesseraConfig> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix, env::vars())?;
        }
        Ok(self.config)
    }

    fn apply_env_overrides(
        &mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> ConfigResult<()> {
        let prefix_with_sep = format!("{prefix}__");
        for (key, value) in vars {
            if let Some(path) = key.strip_prefix(&prefix_with_sep) {
                self.apply_env_var(&key, path, &value)?;
            }
        }
        Ok(())
    }

    fn apply_env_var(&mut self, var: &str, path: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["APP", "TITLE"] => config.app.title = value.to_string(),
            ["APP", "VERSION"] => config.app.version = value.to_string(),

            ["DOCS", "ENABLED"] => config.docs.enabled = parse_bool(var, value)?,
            ["DOCS", "OPENAPI_URL"] => config.docs.openapi_url = value.to_string(),
            ["DOCS", "OPENAPI_VERSION"] => config.docs.openapi_version = value.to_string(),
            ["DOCS", "STRICT_SCHEMA_NAMES"] => {
                config.docs.strict_schema_names = parse_bool(var, value)?;
            }

            ["BINDING", "STRICT_SIGNATURES"] => {
                config.binding.strict_signatures = parse_bool(var, value)?;
            }
            ["BINDING", "MAX_BODY_BYTES"] => {
                config.binding.max_body_bytes = value
                    .parse()
                    .map_err(|_| ConfigError::env(var, "expected integer"))?;
            }

            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env(
                            var,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }

            // Unknown keys are ignored.
            _ => {}
        }

        Ok(())
    }
}

/// Applies the fields present in `content` over `base`.
fn layer(base: &TesseraConfig, content: &str, format: &str) -> ConfigResult<TesseraConfig> {
    // The typed parse reports unknown fields against the source itself.
    let overlay: serde_json::Value = match format {
        "toml" => {
            toml::from_str::<TesseraConfig>(content)?;
            toml::from_str(content)?
        }
        "json" => {
            serde_json::from_str::<TesseraConfig>(content)?;
            serde_json::from_str(content)?
        }
        other => return Err(ConfigError::UnknownFormat(other.to_string())),
    };

    let mut merged = serde_json::to_value(base)?;
    merge(&mut merged, overlay);
    Ok(serde_json::from_value(merged)?)
}

fn merge(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn parse_bool(var: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env(var, "expected boolean")),
    }
}
