//! Error types for ontopic services.

use thiserror::Error;

/// Result type alias using the ontopic error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for ontopic services.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding, vector store, or completion provider failure
    #[error("External service error: {0}")]
    External(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Short machine-readable kind, used as the `code` of error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::External(_) => "external_error",
            Self::Internal(_) | Self::Io(_) | Self::Json(_) => "internal_error",
            Self::Timeout => "timeout",
            Self::WithContext { source, .. } => source.code(),
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Timeout => 504,
            Self::External(_) => 502,
            Self::WithContext { source, .. } => source.status_code(),
            _ => 500,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::External(format!("{err:#}"))
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::External("test".into()).status_code(), 502);
        assert_eq!(Error::Timeout.status_code(), 504);
        assert_eq!(Error::Internal("test".into()).status_code(), 500);
        assert_eq!(Error::Config("test".into()).status_code(), 500);
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::External("qdrant unreachable".into());
        let with_ctx = err.with_context("searching OnTopic");
        assert!(matches!(with_ctx, Error::WithContext { .. }));
        assert_eq!(with_ctx.status_code(), 502);
        assert_eq!(with_ctx.code(), "external_error");
        assert_eq!(
            with_ctx.to_string(),
            "searching OnTopic: External service error: qdrant unreachable"
        );
    }

    #[test]
    fn test_from_anyhow_is_external() {
        let err: Error = anyhow::anyhow!("connection refused").into();
        assert!(matches!(err, Error::External(ref msg) if msg == "connection refused"));
    }

    #[test]
    fn test_result_ext_context() {
        let result: std::result::Result<(), anyhow::Error> = Err(anyhow::anyhow!("boom"));
        let err = result.context("embedding batch").unwrap_err();
        assert!(err.to_string().starts_with("embedding batch:"));
    }
}
