//! Error types for the filing pipeline.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, loading, parsing, chunking,
//! embedding, and storage errors.

use thiserror::Error;

/// Unified error type for the filing pipeline.
///
/// All functions in the application return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (invalid field values, missing files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document loader errors. These are pipeline-fatal: no partial output
    /// is produced for a filing whose source could not be obtained.
    #[error("Loader error: {0}")]
    Loader(String),

    /// Structural parser errors. Malformed segments degrade in place and
    /// never surface here; this variant covers internal invariant
    /// violations only.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Chunking errors
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Chunk store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
