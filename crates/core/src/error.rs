//! Error types shared across crates

use thiserror::Error;

/// Result alias used by the core traits
pub type Result<T> = std::result::Result<T, Error>;

/// Core error
///
/// Crate-specific errors (`RagError`, `LlmError`, ...) convert into this type
/// at the trait boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Render error: {0}")]
    Render(String),
}

impl Error {
    /// Whether the failure came from one of the external providers
    /// (embedding service, vector index, language model).
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Error::Embedding(_) | Error::Index(_) | Error::Completion(_) | Error::Timeout(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failure_classification() {
        assert!(Error::Embedding("quota".into()).is_provider_failure());
        assert!(Error::Index("401".into()).is_provider_failure());
        assert!(Error::Completion("503".into()).is_provider_failure());
        assert!(Error::Timeout("llm".into()).is_provider_failure());

        assert!(!Error::Config("missing key".into()).is_provider_failure());
        assert!(!Error::Render("template".into()).is_provider_failure());
    }

    #[test]
    fn test_display() {
        let err = Error::Index("connection refused".to_string());
        assert_eq!(err.to_string(), "Index error: connection refused");
    }
}
