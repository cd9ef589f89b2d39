//! LLM Types
//!
//! Core types for structured-output oracle calls.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use auraforming_core::proxy::ProxyConfig;

/// Supported LLM provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Gemini,
    OpenAI,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Gemini => write!(f, "gemini"),
            ProviderType::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderType::Gemini),
            "openai" => Ok(ProviderType::OpenAI),
            other => Err(LlmError::InvalidRequest {
                message: format!("Unknown provider: {}", other),
            }),
        }
    }
}

/// Per-request options for provider behavior.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmRequestOptions {
    /// Optional temperature override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_override: Option<f32>,
    /// Optional output token cap override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_override: Option<u32>,
    /// Name attached to the schema where the provider requires one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
}

impl LlmRequestOptions {
    /// Options naming the output schema
    pub fn named(schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: Some(schema_name.into()),
            ..Default::default()
        }
    }
}

/// Configuration for an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The provider type
    pub provider: ProviderType,
    /// API key, read from the environment
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL override (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model name to use
    pub model: String,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Whole-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Outbound proxy
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub proxy: Option<ProxyConfig>,
    /// Provider-specific options
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    30
}

/// Default Gemini model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
/// Default OpenAI model
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::Gemini,
            api_key: None,
            base_url: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            proxy: None,
            options: HashMap::new(),
        }
    }
}

/// Coarse failure class callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmErrorKind {
    /// Missing, invalid or expired credentials; not retryable
    Auth,
    /// Provider overloaded or quota exhausted; retry after a pause
    RateLimit,
    /// Transport failure or a response that does not satisfy the output contract
    Request,
}

/// Error types for LLM operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (invalid API key)
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },
    /// Model not found or not available
    ModelNotFound { model: String },
    /// Invalid request (bad parameters)
    InvalidRequest { message: String },
    /// Server error from the provider
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error
    NetworkError { message: String },
    /// Request exceeded the configured timeout
    Timeout { seconds: u64 },
    /// Response parsing error
    ParseError { message: String },
    /// Other error
    Other { message: String },
}

impl LlmError {
    /// Classify into the three failure classes surfaced to callers.
    pub fn kind(&self) -> LlmErrorKind {
        match self {
            LlmError::AuthenticationFailed { .. } | LlmError::ModelNotFound { .. } => {
                LlmErrorKind::Auth
            }
            LlmError::RateLimited { .. } => LlmErrorKind::RateLimit,
            LlmError::ServerError {
                status: Some(503), ..
            } => LlmErrorKind::RateLimit,
            _ => LlmErrorKind::Request,
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind(), LlmErrorKind::Auth)
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message, .. } => {
                write!(f, "Rate limited: {}", message)
            }
            LlmError::ModelNotFound { model } => {
                write!(f, "Model not found: {}", model)
            }
            LlmError::InvalidRequest { message } => {
                write!(f, "Invalid request: {}", message)
            }
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            LlmError::Timeout { seconds } => {
                write!(f, "Request timed out after {}s", seconds)
            }
            LlmError::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            LlmError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
