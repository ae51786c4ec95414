//! Error types for Keepsake.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! upstream services (generation, embeddings), the document store and the
//! tenant directory.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for Keepsake.
///
/// All fallible functions return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generation (LLM) provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Document store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Tenant directory errors
    #[error("Directory error: {0}")]
    Directory(String),

    /// The store has no nearest-neighbour index for this request
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// An external call exceeded its deadline
    #[error("{operation} timed out after {}s", .after.as_secs_f64())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

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
