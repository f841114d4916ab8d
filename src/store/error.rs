//! Backing-store error types

use thiserror::Error;

/// Errors raised by a [`DocumentCollection`](super::DocumentCollection) backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed an operation
    #[error("Backend error on {collection} during {operation}: {message}")]
    Backend {
        collection: String,
        operation: String,
        message: String,
    },

    /// A document could not be converted to or from its stored form
    #[error("Document serialization error: {0}")]
    Serialization(String),

    /// A collection, field or collation name is not a safe identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Failure armed through `InMemoryCollection::fail_next`
    #[error("Injected failure on {collection} during {operation}")]
    Injected {
        collection: String,
        operation: String,
    },
}

impl StoreError {
    pub fn backend(
        collection: impl Into<String>,
        operation: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Backend {
            collection: collection.into(),
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Serialization(error.to_string())
    }
}

/// Result type for backing-store operations
pub type StoreResult<T> = Result<T, StoreError>;
