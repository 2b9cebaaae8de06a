use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Analysis(#[from] AnalysisError),
}

/// Errors surfaced by the analysis pipeline.
///
/// These are the only failure shapes callers of the gateway, normalizer and
/// sessions ever see; provider-specific errors are translated at the gateway.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The external model call failed (network, provider error, quota).
    #[error("Analysis failed: {message}")]
    Failure { message: String },

    /// The provider answered with content that cannot be shaped into a result.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Pre-flight validation rejected the input; no request was issued.
    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Model provider transport errors.
///
/// Never returned past the gateway, which folds them into
/// [`AnalysisError::Failure`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("GEMINI_API_KEY is required")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AnalysisError {
    /// Build a validation error for a field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Build a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        AnalysisError::MalformedResponse {
            message: message.into(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for analysis operations
pub type AnalysisResultOf<T> = Result<T, AnalysisError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;
