//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions.

use auraforming_core::CoreError;
use auraforming_llm::{LlmError, LlmErrorKind};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Oracle credentials missing, invalid or expired
    #[error("Oracle authentication failed: {0}")]
    OracleAuth(String),

    /// Oracle overloaded or quota exhausted
    #[error("Oracle rate limit reached: {0}")]
    OracleRateLimit(String),

    /// Oracle transport failure or a response violating the output contract
    #[error("Oracle request failed: {0}")]
    OracleRequest(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Source document could not be read or written
    #[error("Document error: {0}")]
    Document(String),

    /// Speech synthesis or transcription failed
    #[error("Speech error: {0}")]
    Speech(String),

    /// Session completed but its filled document could not be produced
    #[error("Finalization failed: {0}")]
    Finalization(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a document error
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// Create a speech error
    pub fn speech(msg: impl Into<String>) -> Self {
        Self::Speech(msg.into())
    }

    /// Create a finalization error
    pub fn finalization(msg: impl Into<String>) -> Self {
        Self::Finalization(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            Self::OracleAuth(_) => "ORACLE_AUTH",
            Self::OracleRateLimit(_) => "ORACLE_RATE_LIMIT",
            Self::OracleRequest(_) => "ORACLE_REQUEST",
            Self::Database(_) | Self::Sqlite(_) => "DATABASE",
            Self::Config(_) => "CONFIG",
            Self::Io(_) => "IO",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Validation(_) => "VALIDATION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Document(_) => "DOCUMENT",
            Self::Speech(_) => "SPEECH",
            Self::Finalization(_) => "FINALIZATION",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the same turn can be retried without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OracleRateLimit(_) | Self::OracleRequest(_))
    }

    /// Whether this is one of the three oracle failures
    pub fn is_oracle(&self) -> bool {
        matches!(
            self,
            Self::OracleAuth(_) | Self::OracleRateLimit(_) | Self::OracleRequest(_)
        )
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err.kind() {
            LlmErrorKind::Auth => Self::OracleAuth(err.to_string()),
            LlmErrorKind::RateLimit => Self::OracleRateLimit(err.to_string()),
            LlmErrorKind::Request => Self::OracleRequest(err.to_string()),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config(msg) => Self::Config(msg),
            CoreError::Serialization(e) => Self::Serialization(e),
            CoreError::Validation(msg) | CoreError::Parse(msg) => Self::Validation(msg),
            CoreError::NotFound(msg) => Self::NotFound(msg),
        }
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        Self::Database(format!("Connection pool error: {}", err))
    }
}

/// Convert AppError to a string suitable for response envelopes
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
