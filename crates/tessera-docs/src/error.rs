//! Error types for document rendering.

use thiserror::Error;

/// A generated document could not be rendered.
///
/// Schema conflicts are registration failures and surface as
/// [`ConfigurationError`](tessera_core::ConfigurationError) from
/// [`OpenApiGenerator::generate`](crate::OpenApiGenerator::generate).
#[derive(Debug, Error)]
pub enum DocsError {
    /// The document did not serialize to JSON.
    #[error("failed to render OpenAPI document: {0}")]
    Render(#[from] serde_json::Error),
}

/// Result type for document rendering.
pub type DocsResult<T> = Result<T, DocsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error() {
        let err: DocsError = serde_json::from_str::<String>("invalid")
            .unwrap_err()
            .into();
        assert!(matches!(err, DocsError::Render(_)));
        assert!(err.to_string().starts_with("failed to render OpenAPI document"));
    }
}
