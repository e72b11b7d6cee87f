//! Route path templates.
//!
//! A template such as `/items/{id}` names its path parameters between braces.
//! Placeholders may share a segment with literal text (`/files/{name}.{ext}`);
//! each one matches a single non-empty run of characters without `/`.

use crate::error::ConfigurationError;
use crate::params::Params;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]*)\}").expect("valid regex"))
}

/// A parsed route template.
///
/// # Example
///
/// ```rust
/// use tessera_core::PathTemplate;
///
/// let template = PathTemplate::parse("/users/{user_id}/posts/{post_id}").unwrap();
/// assert_eq!(template.placeholders(), ["user_id", "post_id"]);
///
/// let params = template.match_path("/users/7/posts/99").unwrap();
/// assert_eq!(params.get("user_id"), Some("7"));
/// assert_eq!(params.get("post_id"), Some("99"));
/// assert!(template.match_path("/users/7").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    placeholders: Vec<String>,
    matcher: Regex,
}

impl PathTemplate {
    /// Parses a template.
    ///
    /// # Errors
    ///
    /// Fails if the template does not start with `/`, contains an empty
    /// placeholder, or repeats a placeholder name.
    pub fn parse(template: &str) -> Result<Self, ConfigurationError> {
        if !template.starts_with('/') {
            return Err(ConfigurationError::invalid_template(
                template,
                "must start with '/'",
            ));
        }

        let mut placeholders: Vec<String> = Vec::new();
        let mut pattern = String::from("^");
        let mut last = 0;

        for caps in placeholder_regex().captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str().trim();
            if name.is_empty() {
                return Err(ConfigurationError::invalid_template(
                    template,
                    "empty placeholder",
                ));
            }
            if placeholders.iter().any(|p| p == name) {
                return Err(ConfigurationError::invalid_template(
                    template,
                    format!("placeholder `{name}` appears twice"),
                ));
            }
            pattern.push_str(&regex::escape(&template[last..whole.start()]));
            pattern.push_str("([^/]+)");
            last = whole.end();
            placeholders.push(name.to_string());
        }
        pattern.push_str(&regex::escape(&template[last..]));
        pattern.push('$');

        let matcher = Regex::new(&pattern)
            .map_err(|e| ConfigurationError::invalid_template(template, e.to_string()))?;

        Ok(Self {
            raw: template.to_string(),
            placeholders,
            matcher,
        })
    }

    /// Returns the template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the placeholder names in template order.
    #[must_use]
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Returns true if `name` is a placeholder.
    #[must_use]
    pub fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders.iter().any(|p| p == name)
    }

    /// Matches a concrete request path, returning the percent-decoded
    /// placeholder values.
    ///
    /// A segment that does not decode to UTF-8 does not match.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let caps = self.matcher.captures(path)?;
        let mut params = Params::new();
        for (name, value) in self.placeholders.iter().zip(caps.iter().skip(1)) {
            let decoded = percent_decode_str(value?.as_str()).decode_utf8().ok()?;
            params.push(name.as_str(), decoded);
        }
        Some(params)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
