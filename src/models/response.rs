//! Response Types
//!
//! Standard JSON envelope for all HTTP handlers.

use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

/// Generic response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub code: Option<String>,
}

impl<T> CommandResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    /// Create an error response carrying the error's machine code
    pub fn from_error(error: &AppError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            code: Some(error.code().to_string()),
        }
    }

    /// Attach partial data to an error response
    pub fn with_data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }
}

impl<T> From<Result<T, AppError>> for CommandResponse<T> {
    fn from(result: Result<T, AppError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::from_error(&e),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub database: bool,
    pub oracle_configured: bool,
    /// The oracle answered a credentialed health request
    pub oracle_reachable: bool,
    pub speech_configured: bool,
    pub active_sessions: usize,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            service: "auraforming".to_string(),
            database: false,
            oracle_configured: false,
            oracle_reachable: false,
            speech_configured: false,
            active_sessions: 0,
        }
    }
}
