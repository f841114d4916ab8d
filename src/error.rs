//! Error types for the punishments core.
//!

use crate::config::ConfigurationError;
use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PunishmentsError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PunishmentsError {
    fn from(error: serde_json::Error) -> Self {
        PunishmentsError::Serialization(format!("JSON serialization error: {error}"))
    }
}

impl From<sqlx::Error> for PunishmentsError {
    fn from(err: sqlx::Error) -> Self {
        PunishmentsError::Database(err.to_string())
    }
}

impl From<ConfigurationError> for PunishmentsError {
    fn from(err: ConfigurationError) -> Self {
        PunishmentsError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PunishmentsError>;
