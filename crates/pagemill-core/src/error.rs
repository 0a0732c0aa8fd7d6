use thiserror::Error;

/// Application-wide error types for pagemill.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (non-2xx status or protocol-level fault).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The extraction backend reported a failure in its response body.
    #[error("Backend error: {message}")]
    ApiError { message: String },

    /// LLM API call failed.
    #[error("LLM error (HTTP {status_code}): {message}")]
    LlmError {
        message: String,
        status_code: u16,
        retryable: bool,
    },

    /// Invalid configuration: unknown backend, bad URL, missing credentials.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Writing results to the sink failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    /// Returns true if this error is a transport-level fault that warrants
    /// a backoff delay before the next attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::NetworkError(_) | AppError::Timeout(_)
        )
    }

    /// Returns true if this error is worth another attempt at all.
    ///
    /// Transient transport faults and backend-reported failures are retried
    /// inside the attempt window; configuration and storage errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::ApiError { .. } => true,
            AppError::LlmError { retryable, .. } => *retryable,
            other => other.is_transient(),
        }
    }
}
