//! The root configuration type.

use serde::{Deserialize, Serialize};

use crate::{AppSection, BindingSection, ConfigError, DocsSection, LogFormat, LoggingSection};

/// Complete Tessera application configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use tessera_config::TesseraConfig;
///
/// let config = TesseraConfig::default();
/// assert_eq!(config.docs.openapi_url, "/openapi.json");
/// assert_eq!(config.binding.max_body_bytes, 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct TesseraConfig {
    /// Application metadata.
    #[serde(default)]
    pub app: AppSection,

    /// Documentation settings.
    #[serde(default)]
    pub docs: DocsSection,

    /// Binding settings.
    #[serde(default)]
    pub binding: BindingSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl TesseraConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - the title is empty
    /// - the docs URL does not start with `/` while docs are enabled
    /// - the body limit is zero
    /// - the log level is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.title.trim().is_empty() {
            return Err(ConfigError::invalid("app.title", "must not be empty"));
        }

        if self.docs.enabled && !self.docs.openapi_url.starts_with('/') {
            return Err(ConfigError::invalid(
                "docs.openapi_url",
                format!("must start with '/': {}", self.docs.openapi_url),
            ));
        }

        if self.binding.max_body_bytes == 0 {
            return Err(ConfigError::invalid(
                "binding.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid("logging.level", "must not be empty"));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs and strict registration checks.
    #[must_use]
    pub fn development() -> Self {
        Self {
            binding: BindingSection {
                strict_signatures: true,
                ..BindingSection::default()
            },
            docs: DocsSection {
                strict_schema_names: true,
                ..DocsSection::default()
            },
            logging: LoggingSection {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
            },
            ..Self::default()
        }
    }

    /// Production preset: JSON logs at info level.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(TesseraConfig::default().validate().is_ok());
        assert!(TesseraConfig::development().validate().is_ok());
    }

    #[test]
    fn test_development_preset() {
        let config = TesseraConfig::development();
        assert!(config.binding.strict_signatures);
        assert!(config.docs.strict_schema_names);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_validate_openapi_url() {
        let mut config = TesseraConfig::default();
        config.docs.openapi_url = "openapi.json".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref field, .. }) if field == "docs.openapi_url"
        ));

        config.docs.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_body_limit() {
        let mut config = TesseraConfig::default();
        config.binding.max_body_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_keeps_sections() {
        let config = TesseraConfig::development();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: TesseraConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
