//! Error types for TaskWeave
//!
//! Defines the error enum covering all failure modes across the core.
//! Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Result type alias for TaskWeave operations
pub type Result<T> = std::result::Result<T, TaskWeaveError>;

/// Comprehensive error type for TaskWeave operations
#[derive(Error, Debug)]
pub enum TaskWeaveError {
    /// Configuration errors (unknown provider, bad preset, invalid file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request rate limit exceeded (retryable, carries a backoff hint)
    #[error("Rate limit exceeded, retry after {retry_after_ms} ms")]
    RateLimitExceeded {
        /// Milliseconds until the next token becomes available
        retry_after_ms: u64,
    },

    /// Rate limiter queue is at capacity (retryable)
    #[error("Rate limiter queue full, retry after {retry_after_ms} ms")]
    QueueFull {
        /// Milliseconds until the next token becomes available
        retry_after_ms: u64,
    },

    /// Field-mapping configuration errors (unknown transform, missing
    /// required field). These indicate a bug in a mapping table, not bad
    /// external data, and are never surfaced to end users.
    #[error("Mapping configuration error: {0}")]
    MappingConfig(String),

    /// Webhook signature verification failed (rejected with 401)
    #[error("Webhook signature verification failed")]
    SignatureInvalid,

    /// Webhook payload could not be parsed (rejected with 400)
    #[error("Malformed webhook payload: {0}")]
    PayloadMalformed(String),

    /// A registered webhook handler failed; caught per-handler and logged
    #[error("Webhook handler error: {0}")]
    Handler(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),

    /// Anyhow errors (for more context)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

impl crate::retry::RetryableError for TaskWeaveError {
    fn retry_decision(&self) -> crate::retry::RetryDecision {
        use crate::retry::RetryDecision;
        use std::time::Duration;

        match self {
            // Retryable errors with a precise backoff hint
            TaskWeaveError::RateLimitExceeded { retry_after_ms }
            | TaskWeaveError::QueueFull { retry_after_ms } => {
                RetryDecision::RetryAfter(Duration::from_millis(*retry_after_ms))
            }
            // Non-retryable errors
            TaskWeaveError::Config(_) => RetryDecision::NoRetry,
            TaskWeaveError::MappingConfig(_) => RetryDecision::NoRetry,
            TaskWeaveError::SignatureInvalid => RetryDecision::NoRetry,
            TaskWeaveError::PayloadMalformed(_) => RetryDecision::NoRetry,
            TaskWeaveError::Handler(_) => RetryDecision::NoRetry,
            TaskWeaveError::Json(_) => RetryDecision::NoRetry,
            TaskWeaveError::Yaml(_) => RetryDecision::NoRetry,
            TaskWeaveError::Io(_) => RetryDecision::NoRetry,
            TaskWeaveError::Other(_) => RetryDecision::NoRetry,
            TaskWeaveError::Anyhow(_) => RetryDecision::NoRetry,
        }
    }
}
