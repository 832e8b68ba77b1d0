//! Error types for slugtree.

use thiserror::Error;

/// Result type alias using slugtree's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for slugtree operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A write was rejected before it reached the document store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// External collaborator (document or redirect store) failed
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error should block the originating write.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation("slug is reserved".to_string());
        assert_eq!(err.to_string(), "Validation error: slug is reserved");
        assert!(err.is_validation());
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("DATABASE_URL is not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: DATABASE_URL is not set");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_error_display_document_not_found() {
        let err = Error::DocumentNotFound("doc-1".to_string());
        assert_eq!(err.to_string(), "Document not found: doc-1");
    }

    #[test]
    fn test_error_display_store() {
        let err = Error::Store("connection reset".to_string());
        assert_eq!(err.to_string(), "Store error: connection reset");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("missing locale".to_string());
        assert_eq!(err.to_string(), "Invalid input: missing locale");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
